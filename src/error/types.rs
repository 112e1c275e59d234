//! Error types
//!
//! Every fallible vault operation returns [`VaultError`]. Variants other than
//! `Internal` carry a message that is safe to show to the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault operation errors
#[derive(Debug, Error)]
pub enum VaultError {
    /// A user-supplied path escaped the vault root.
    #[error("Path outside of vault: {0}")]
    PathViolation(String),

    /// Bad or missing filename, wrong target type, broken request body.
    #[error("{0}")]
    InvalidRequest(String),

    /// Destination already exists, or an upload of it is in progress.
    #[error("{0}")]
    Conflict(String),

    /// Not enough quota left for the transfer.
    #[error("Storage quota exceeded")]
    QuotaExceeded { needed: u64, free: u64 },

    /// Single request body over the configured upload limit.
    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    /// Missing file on download.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected I/O failure. Details are logged, never returned.
    #[error("I/O error: {0}")]
    Internal(#[from] io::Error),
}

impl VaultError {
    /// Converts a write-side I/O error, reporting a full disk as a quota failure.
    pub fn from_write(error: io::Error, needed: u64) -> Self {
        if error.kind() == io::ErrorKind::StorageFull {
            VaultError::QuotaExceeded { needed, free: 0 }
        } else {
            VaultError::Internal(error)
        }
    }

    /// Message returned to the caller. `fallback` replaces internal details.
    pub fn public_message(&self, fallback: &str) -> String {
        match self {
            VaultError::Internal(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("another FlashVault process already serves {0}")]
    AlreadyRunning(PathBuf),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] VaultError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
