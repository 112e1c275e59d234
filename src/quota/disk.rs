use log::{error, info};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::VaultResult;
use crate::quota::QuotaTracker;

/// Free space read live from the filesystem holding the root, minus a
/// safety margin.
///
/// Nothing is kept in memory, so several processes may share a root. Staged
/// uploads already occupy the disk, which is why commit and release are
/// no-ops and admission only checks that the margin survived the write.
#[derive(Debug)]
pub struct DiskQuota {
    root: PathBuf,
    margin: u64,
}

impl DiskQuota {
    pub fn new(root: PathBuf, margin: u64) -> Self {
        Self { root, margin }
    }

    fn available(&self) -> Option<u64> {
        match filesystem_space(&self.root) {
            Ok(space) => Some(space.available),
            Err(e) => {
                error!("Failed to query free space of {}: {}", self.root.display(), e);
                None
            }
        }
    }
}

impl QuotaTracker for DiskQuota {
    fn initialize(&self) -> VaultResult<u64> {
        let space = filesystem_space(&self.root)?;
        let used = space.total.saturating_sub(space.available);
        info!(
            "Disk accounting: {} bytes available, {} byte margin",
            space.available, self.margin
        );
        Ok(used)
    }

    fn free_space(&self) -> u64 {
        self.available()
            .map(|available| available.saturating_sub(self.margin))
            .unwrap_or(0)
    }

    fn try_commit(&self, _bytes: u64) -> bool {
        self.available()
            .map(|available| available >= self.margin)
            .unwrap_or(false)
    }

    fn commit(&self, _bytes: u64) {}

    fn release(&self, _bytes: u64) {}

    fn used(&self) -> u64 {
        filesystem_space(&self.root)
            .map(|space| space.total.saturating_sub(space.available))
            .unwrap_or(0)
    }

    fn quota(&self) -> Option<u64> {
        None
    }
}

struct FilesystemSpace {
    total: u64,
    available: u64,
}

#[cfg(unix)]
fn filesystem_space(path: &Path) -> io::Result<FilesystemSpace> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
    let fragment = stat.fragment_size() as u64;
    Ok(FilesystemSpace {
        total: (stat.blocks() as u64).saturating_mul(fragment),
        available: (stat.blocks_available() as u64).saturating_mul(fragment),
    })
}

#[cfg(not(unix))]
fn filesystem_space(_path: &Path) -> io::Result<FilesystemSpace> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "disk quota strategy requires a unix filesystem",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_free_space_subtracts_margin() {
        let temp = tempfile::tempdir().unwrap();
        let raw = DiskQuota::new(temp.path().to_path_buf(), 0);
        let available = raw.free_space();
        assert!(available > 0);

        let huge_margin = DiskQuota::new(temp.path().to_path_buf(), u64::MAX);
        assert_eq!(huge_margin.free_space(), 0);
        assert!(!huge_margin.try_commit(1));
        assert!(!huge_margin.reserve_hint(0));
    }

    #[test]
    fn test_accounting_calls_are_noops() {
        let temp = tempfile::tempdir().unwrap();
        let quota = DiskQuota::new(temp.path().to_path_buf(), 0);
        assert!(quota.initialize().is_ok());
        assert!(quota.try_commit(10));
        quota.release(10);
        assert_eq!(quota.quota(), None);
    }

    #[test]
    fn test_missing_root_reports_no_space() {
        let temp = tempfile::tempdir().unwrap();
        let quota = DiskQuota::new(temp.path().join("gone"), 0);
        assert_eq!(quota.free_space(), 0);
        assert!(quota.initialize().is_err());
    }
}
