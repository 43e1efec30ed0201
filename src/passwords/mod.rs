//! Dealing with user passwords.
mod hash;
mod password;

pub use hash::Hash;
pub use password::{Password, PasswordInvalidity};
