//! Transfer result types
//!
//! Inputs and outputs of the upload pipeline.

use serde::Serialize;

/// Upload metadata taken from the request headers
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Destination directory relative to the root (`X-Upload-Path`)
    pub upload_path: String,
    /// Raw, unsanitized file name (`X-Filename`)
    pub filename: Option<String>,
    /// Declared body length, if the client sent one
    pub content_length: Option<u64>,
}

/// Result of a committed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    /// `/`-separated path of the new file relative to the root
    pub path: String,
    pub size: u64,
}
