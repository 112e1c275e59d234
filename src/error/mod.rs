//! Error handling
//!
//! Defines the vault error taxonomy and its mapping to HTTP status codes.

pub mod handlers;
pub mod types;

pub use handlers::{log_error, status_code};
pub use types::*;
