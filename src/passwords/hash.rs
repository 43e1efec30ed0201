use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use rand_core::OsRng;

use super::Password;

/// The hash of a user's password.
#[derive(Clone, Debug)]
pub struct Hash(String);

impl Hash {
    /// Hash a user's password with a freshly generated salt.
    pub fn new(password: &Password) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), salt.as_ref())?
            .to_string();

        Ok(Self(password_hash))
    }

    /// Construct a hash from its string representation.
    ///
    /// This is intended for recreating the hash from a value that has been
    /// persisted. Fails if the provided string is not a valid hash.
    pub fn from_hash_str(hash: &str) -> Result<Self> {
        Ok(Self(PasswordHash::new(hash)?.to_string()))
    }

    /// Determine if the hash value matches a raw password.
    pub fn matches_raw_password(&self, raw_password: &str) -> Result<bool> {
        // This should be valid due to a `Hash` only being creatable from valid
        // data.
        let parsed_hash = PasswordHash::new(&self.0)?;

        match Argon2::default().verify_password(raw_password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    /// Retrieve the hash's string representation.
    pub fn value(&self) -> &str {
        &self.0
    }
}
