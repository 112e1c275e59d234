//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;
use std::path::PathBuf;

/// A file or directory under the vault root, derived from the filesystem on demand.
#[derive(Debug, Clone, Serialize)]
pub struct StoredItem {
    pub name: String,
    /// `/`-separated path relative to the root
    pub path: String,
    pub is_file: bool,
    /// Bytes, 0 for directories
    pub size: u64,
    /// Human-readable size, empty for directories
    pub size_label: String,
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub mtime: String,
}

/// One step of the breadcrumb trail from the root to the current directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// One page of a directory listing
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub entries: Vec<StoredItem>,
    pub count: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Result of a file retrieval operation
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub file_path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// Result of a file deletion operation
#[derive(Debug, Clone)]
pub struct DeleteResult {
    /// Bytes given back to the quota
    pub released: u64,
}
