//! Error handlers
//!
//! Maps vault errors to HTTP status codes and logs them at the right level.

use crate::error::types::VaultError;
use axum::http::StatusCode;
use log::{error, warn};

/// Log a vault error raised while serving `operation`
pub fn log_error(operation: &str, err: &VaultError) {
    match err {
        VaultError::Internal(e) => error!("{} failed: {:?}", operation, e),
        VaultError::PathViolation(p) => warn!("{} rejected path traversal attempt: {}", operation, p),
        other => warn!("{} rejected: {}", operation, other),
    }
}

/// Convert error to HTTP response code
pub fn status_code(err: &VaultError) -> StatusCode {
    match err {
        VaultError::PathViolation(_) => StatusCode::FORBIDDEN,
        VaultError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        VaultError::Conflict(_) => StatusCode::CONFLICT,
        VaultError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
        VaultError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        VaultError::NotFound(_) => StatusCode::NOT_FOUND,
        VaultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_code(&VaultError::InvalidRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&VaultError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&VaultError::QuotaExceeded { needed: 2, free: 1 }).as_u16(),
            507
        );
        assert_eq!(
            status_code(&VaultError::PathViolation("../x".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_full_disk_is_quota_error() {
        let err = VaultError::from_write(io::Error::from(io::ErrorKind::StorageFull), 10);
        assert!(matches!(err, VaultError::QuotaExceeded { needed: 10, .. }));

        let err = VaultError::from_write(io::Error::from(io::ErrorKind::PermissionDenied), 10);
        assert!(matches!(err, VaultError::Internal(_)));
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = VaultError::Internal(io::Error::other("disk controller on fire"));
        assert_eq!(err.public_message("Upload failed"), "Upload failed");

        let err = VaultError::Conflict("File already exists".into());
        assert_eq!(err.public_message("Upload failed"), "File already exists");
    }
}
