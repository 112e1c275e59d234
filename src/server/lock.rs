//! Single-process guard
//!
//! The counter quota keeps its state in memory, so two servers on one root
//! would each admit uploads against their own count. An exclusive `flock` on
//! a file inside the root makes the second server refuse to start. The
//! kernel drops the lock when the process exits, so a crash leaves no stale
//! lock behind.

use std::path::{Path, PathBuf};

use crate::error::StartupError;
use crate::storage::LOCK_FILE_NAME;

#[cfg(unix)]
pub struct ProcessLock {
    _lock: nix::fcntl::Flock<std::fs::File>,
    path: PathBuf,
}

#[cfg(unix)]
impl ProcessLock {
    pub fn acquire(root: &Path) -> Result<Self, StartupError> {
        use nix::errno::Errno;
        use nix::fcntl::{Flock, FlockArg};
        use std::io::Write;

        let path = root.join(LOCK_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        let lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                return Err(StartupError::AlreadyRunning(root.to_path_buf()));
            }
            Err((_, errno)) => return Err(StartupError::Io(errno.into())),
        };

        let mut owner: &std::fs::File = &lock;
        owner.set_len(0)?;
        write!(owner, "{}", std::process::id())?;

        Ok(Self { _lock: lock, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(not(unix))]
pub struct ProcessLock {
    path: PathBuf,
}

#[cfg(not(unix))]
impl ProcessLock {
    pub fn acquire(root: &Path) -> Result<Self, StartupError> {
        log::warn!("Process lock unsupported on this platform; run a single instance per root");
        Ok(Self {
            path: root.join(LOCK_FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
