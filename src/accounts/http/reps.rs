use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};

use crate::{accounts::domain::email::EmailInvalidity, passwords::PasswordInvalidity};

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct PasswordResetRequested {
    pub message: String,
}

impl Default for PasswordResetRequested {
    fn default() -> Self {
        Self {
            message: "If the address is registered, a password reset email is on its way."
                .to_owned(),
        }
    }
}

#[derive(Default, Serialize)]
pub struct PasswordResetValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<String>,
}

impl From<ValidationContext<EmailInvalidity>> for PasswordResetValidationError {
    fn from(context: ValidationContext<EmailInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in context.into_iter() {
            let message = match invalidity {
                EmailInvalidity::MissingDomain => "Email is missing a domain.",
                EmailInvalidity::MissingSeparator => "Email is missing an '@' symbol.",
            };

            response.email.push(message.to_owned());
        }

        response
    }
}

#[derive(Deserialize)]
pub struct CompletePasswordReset {
    pub password: String,
    pub password_confirm: String,
}

impl CompletePasswordReset {
    /// Whether the submitted password and its confirmation agree. Checked
    /// before the new password is validated or any account is touched.
    pub fn confirmation_matches(&self) -> bool {
        self.password == self.password_confirm
    }
}

#[derive(Default, Serialize)]
pub struct NewPasswordValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub password: Vec<String>,
}

impl From<ValidationContext<PasswordInvalidity>> for NewPasswordValidationError {
    fn from(context: ValidationContext<PasswordInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in context.into_iter() {
            let message = match invalidity {
                PasswordInvalidity::MaxLength(max) => {
                    format!("Password may be at most {} characters long.", max)
                }
                PasswordInvalidity::MinLength(min) => {
                    format!("Password must be at least {} characters long.", min)
                }
            };

            response.password.push(message);
        }

        response
    }
}

#[derive(Serialize)]
pub struct PasswordResetComplete {
    pub message: String,
}

impl Default for PasswordResetComplete {
    fn default() -> Self {
        Self {
            message: "Password updated.".to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn confirmation_must_match_exactly() {
        let mismatched = CompletePasswordReset {
            password: "abc".to_owned(),
            password_confirm: "xyz".to_owned(),
        };
        let matched = CompletePasswordReset {
            password: "NewPass123!".to_owned(),
            password_confirm: "NewPass123!".to_owned(),
        };

        assert!(!mismatched.confirmation_matches());
        assert!(matched.confirmation_matches());
    }

    #[test]
    fn email_validation_errors_are_itemized() {
        use semval::ValidatedFrom;

        use crate::accounts::domain::email::Email;

        let (_, context) =
            Email::validated_from("someone@").expect_err("address should be invalid");

        let response = PasswordResetValidationError::from(context);

        assert_eq!(vec!["Email is missing a domain.".to_owned()], response.email);
    }
}
