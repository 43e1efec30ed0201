pub mod domain;
pub mod http;
mod service;

pub use service::{
    ConsumeResetError, IssueResetError, IssuedReset, PasswordResetService, ValidateResetError,
};
