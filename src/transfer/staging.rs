//! Staging artifacts
//!
//! An upload is written to `<final path>.part` and only renamed onto its
//! final name once complete. [`StagingFile`] owns that artifact and deletes
//! it when dropped, unless [`StagingFile::persist`] moved it into place.
//! Dropping covers every early return as well as a cancelled request future.
//!
//! Creation and the final rename are synchronous. A cancelled future cannot
//! leave a background open or rename running after the guard is gone.

use log::{debug, warn};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::fs::{self, OpenOptions};
use tokio::fs::File;

use crate::storage::STAGING_SUFFIX;

#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    armed: bool,
}

impl StagingFile {
    /// Creates the staging artifact next to `final_path`.
    ///
    /// Fails with `AlreadyExists` while another upload of the same name is
    /// in progress; that artifact is left alone.
    pub fn create(final_path: &Path) -> io::Result<(Self, File)> {
        let path = staging_path(final_path);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        debug!("Staging upload at {}", path.display());
        Ok((Self { path, armed: true }, File::from_std(file)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically renames the artifact onto `target` and hands ownership of
    /// the bytes over to it. On failure the artifact is still removed.
    pub fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Discarded staging file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staging file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// `<final path>.part`
pub fn staging_path(final_path: &Path) -> PathBuf {
    let mut path = OsString::from(final_path.as_os_str());
    path.push(STAGING_SUFFIX);
    PathBuf::from(path)
}
