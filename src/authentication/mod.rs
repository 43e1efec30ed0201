pub mod http;
mod session;
mod verifier;

pub use session::{Session, SESSION_COOKIE};
pub use verifier::{
    CredentialVerifier, DynCredentialVerifier, PasswordCredentialVerifier, VerifyCredentialsError,
};
