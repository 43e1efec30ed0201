pub mod email;
pub mod resets;
