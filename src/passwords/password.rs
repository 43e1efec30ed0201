use std::fmt::Debug;

use semval::prelude::*;

const MAX_PASSWORD_LENGTH: usize = 512;
const MIN_PASSWORD_LENGTH: usize = 8;

/// A user's plain-text password.
pub struct Password(String);

impl Password {
    /// Construct an unvalidated password.
    ///
    /// Useful when building an object that contains a password so the object
    /// can be validated as a whole.
    pub fn unvalidated(password: String) -> Self {
        Self(password)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PasswordInvalidity {
    /// The provided value exceeds the maximum allowable length for a password.
    /// The max length is contained as a value.
    MaxLength(usize),
    /// The provided value is smaller than the minimum allowable length for a
    /// password. The min length is contained as a value.
    MinLength(usize),
}

impl Validate for Password {
    type Invalidity = PasswordInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.0.len() < MIN_PASSWORD_LENGTH,
                PasswordInvalidity::MinLength(MIN_PASSWORD_LENGTH),
            )
            .invalidate_if(
                self.0.len() > MAX_PASSWORD_LENGTH,
                PasswordInvalidity::MaxLength(MAX_PASSWORD_LENGTH),
            )
            .into()
    }
}

impl ValidatedFrom<&str> for Password {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Password(from.to_owned());

        match into.validate() {
            Ok(_) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't include the raw password in debug output.
        f.debug_tuple("Password").field(&"*".repeat(8)).finish()
    }
}
