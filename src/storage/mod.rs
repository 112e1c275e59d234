//! File system storage management
//!
//! Path confinement, directory listing, and file retrieval and deletion.

pub mod listing;
pub mod operations;
pub mod results;
pub mod validation;

/// Suffix marking an in-progress upload.
pub const STAGING_SUFFIX: &str = ".part";

/// Advisory lock file held by a counter-backed server, see `server::lock`.
pub const LOCK_FILE_NAME: &str = ".flashvault.lock";

/// Whether a directory entry is vault bookkeeping rather than user content.
pub fn is_internal_name(name: &str) -> bool {
    name == LOCK_FILE_NAME || name.ends_with(STAGING_SUFFIX)
}

/// Whether the last component of `path` is vault bookkeeping.
pub fn is_internal_path(path: &std::path::Path) -> bool {
    path.file_name()
        .is_some_and(|name| is_internal_name(&name.to_string_lossy()))
}

pub use listing::{breadcrumbs, list_directory, paginate};
pub use operations::{delete_file, prepare_file_retrieval, remove_stale_staging};
pub use results::{Breadcrumb, DeleteResult, Page, RetrieveResult, StoredItem};
pub use validation::{VaultRoot, sanitize_filename};
