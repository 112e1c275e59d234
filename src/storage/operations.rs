//! Storage operations
//!
//! File retrieval, deletion with quota release, and staging cleanup.

use log::{error, info, warn};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::error::{VaultError, VaultResult};
use crate::quota::QuotaTracker;
use crate::storage::{STAGING_SUFFIX, is_internal_path};
use crate::storage::results::{DeleteResult, RetrieveResult};
use crate::storage::validation::VaultRoot;

const DELETE_RETRIES: u64 = 3;

/// Prepares for file retrieval
pub async fn prepare_file_retrieval(root: &VaultRoot, subpath: &str) -> VaultResult<RetrieveResult> {
    let file_path = root.resolve(subpath)?;
    if is_internal_path(&file_path) {
        return Err(VaultError::NotFound("File not found".into()));
    }

    let metadata = match fs::metadata(&file_path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(VaultError::NotFound("File not found".into())),
    };

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(RetrieveResult {
        file_path,
        file_name,
        size: metadata.len(),
    })
}

/// Deletes a file and gives its bytes back to the quota.
///
/// The quota is released only after the removal succeeded, so a concurrent
/// second delete of the same file (whose removal fails) releases nothing.
pub async fn delete_file(
    root: &VaultRoot,
    quota: &dyn QuotaTracker,
    subpath: &str,
) -> VaultResult<DeleteResult> {
    let file_path = root.resolve(subpath)?;
    // Staging artifacts and the lock file are never counted, so never released.
    if is_internal_path(&file_path) {
        return Err(VaultError::InvalidRequest("Not a file".into()));
    }

    let size = match fs::metadata(&file_path).await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => return Err(VaultError::InvalidRequest("Not a file".into())),
    };

    // Retry permission errors; removable media can hold files briefly.
    for attempt in 1..=DELETE_RETRIES {
        match fs::remove_file(&file_path).await {
            Ok(()) => {
                quota.release(size);
                info!("Deleted: {} ({} bytes)", subpath, size);
                return Ok(DeleteResult { released: size });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VaultError::InvalidRequest("Not a file".into()));
            }
            Err(e) if attempt < DELETE_RETRIES && e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(
                    "Delete of {} denied (attempt {}/{}), retrying",
                    subpath, attempt, DELETE_RETRIES
                );
                tokio::time::sleep(Duration::from_millis(100 * attempt)).await;
            }
            Err(e) => {
                error!("Failed to delete {} ({}): {}", subpath, file_path.display(), e);
                return Err(VaultError::Internal(e));
            }
        }
    }

    Err(VaultError::Internal(io::Error::other(
        "Failed to delete file after retries",
    )))
}

/// Removes staging artifacts left behind by a crashed process.
///
/// Only safe while holding the process lock: another live server on the same
/// root would lose its in-progress uploads. Returns how many were removed.
pub fn remove_stale_staging(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            removed += remove_stale_staging(&path)?;
        } else if file_type.is_file() && entry.file_name().to_string_lossy().ends_with(STAGING_SUFFIX) {
            std::fs::remove_file(&path)?;
            warn!("Removed stale staging file {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::CounterQuota;

    fn setup() -> (tempfile::TempDir, VaultRoot) {
        let temp = tempfile::tempdir().unwrap();
        let root = VaultRoot::new(temp.path()).unwrap();
        (temp, root)
    }

    #[tokio::test]
    async fn test_delete_releases_exactly_once() {
        let (_temp, root) = setup();
        std::fs::write(root.path().join("a.bin"), vec![0u8; 300]).unwrap();
        let quota = CounterQuota::new(root.path().to_path_buf(), 1000);
        quota.initialize().unwrap();
        assert_eq!(quota.used(), 300);

        let result = delete_file(&root, &quota, "a.bin").await.unwrap();
        assert_eq!(result.released, 300);
        assert_eq!(quota.used(), 0);
        assert!(!root.path().join("a.bin").exists());

        let second = delete_file(&root, &quota, "a.bin").await;
        assert!(matches!(second, Err(VaultError::InvalidRequest(_))));
        assert_eq!(quota.used(), 0);
        assert_eq!(quota.free_space(), 1000);
    }

    #[tokio::test]
    async fn test_delete_rejects_directories_and_traversal() {
        let (_temp, root) = setup();
        std::fs::create_dir(root.path().join("folder")).unwrap();
        let quota = CounterQuota::new(root.path().to_path_buf(), 1000);

        assert!(matches!(
            delete_file(&root, &quota, "folder").await,
            Err(VaultError::InvalidRequest(_))
        ));
        assert!(matches!(
            delete_file(&root, &quota, "").await,
            Err(VaultError::InvalidRequest(_))
        ));
        assert!(matches!(
            delete_file(&root, &quota, "../../etc/passwd").await,
            Err(VaultError::PathViolation(_))
        ));
        assert!(root.path().join("folder").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_file_retrieval() {
        let (_temp, root) = setup();
        std::fs::create_dir(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/notes.txt"), b"hello").unwrap();

        let found = prepare_file_retrieval(&root, "docs/notes.txt").await.unwrap();
        assert_eq!(found.file_name, "notes.txt");
        assert_eq!(found.size, 5);

        assert!(matches!(
            prepare_file_retrieval(&root, "docs").await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            prepare_file_retrieval(&root, "docs/missing.txt").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_internal_files_not_reachable() {
        let (_temp, root) = setup();
        std::fs::write(root.path().join("kept.bin"), vec![0u8; 100]).unwrap();
        std::fs::write(root.path().join(crate::storage::LOCK_FILE_NAME), b"12345").unwrap();
        std::fs::write(root.path().join("movie.mkv.part"), vec![0u8; 11]).unwrap();
        let quota = CounterQuota::new(root.path().to_path_buf(), 1000);
        quota.initialize().unwrap();
        assert_eq!(quota.used(), 100);

        for name in [crate::storage::LOCK_FILE_NAME, "movie.mkv.part"] {
            assert!(matches!(
                prepare_file_retrieval(&root, name).await,
                Err(VaultError::NotFound(_))
            ));
            assert!(matches!(
                delete_file(&root, &quota, name).await,
                Err(VaultError::InvalidRequest(_))
            ));
            assert!(root.path().join(name).exists());
        }
        assert_eq!(quota.used(), 100);
    }

    #[test]
    fn test_remove_stale_staging() {
        let (_temp, root) = setup();
        std::fs::create_dir(root.path().join("sub")).unwrap();
        std::fs::write(root.path().join("keep.txt"), b"k").unwrap();
        std::fs::write(root.path().join("old.iso.part"), b"partial").unwrap();
        std::fs::write(root.path().join("sub/movie.part"), b"partial").unwrap();

        assert_eq!(remove_stale_staging(root.path()).unwrap(), 2);
        assert!(root.path().join("keep.txt").exists());
        assert!(!root.path().join("old.iso.part").exists());
        assert!(!root.path().join("sub/movie.part").exists());
    }
}
