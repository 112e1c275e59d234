//! Storage accounting
//!
//! [`QuotaTracker`] is the single source of truth for how many bytes may still
//! be written. Two implementations share the contract:
//!
//! - [`CounterQuota`]: exact in-memory counter against a fixed quota. Fast, but
//!   valid only when one process owns the root (the server enforces this with
//!   an advisory lock file).
//! - [`DiskQuota`]: live free-space query minus a safety margin. Safe with
//!   several processes, slower and racier.

mod counter;
mod disk;
mod scan;

pub use counter::CounterQuota;
pub use disk::DiskQuota;
pub use scan::used_bytes;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{QuotaStrategy, ServerConfig};
use crate::error::VaultResult;

/// Admission control and accounting for stored bytes.
pub trait QuotaTracker: Send + Sync {
    /// Establishes the accounting baseline. Runs once, before serving traffic.
    /// Returns the bytes found in use.
    fn initialize(&self) -> VaultResult<u64>;

    /// Bytes that may still be written.
    fn free_space(&self) -> u64;

    /// Advisory check before a transfer starts. Holds no reservation.
    fn reserve_hint(&self, bytes: u64) -> bool {
        self.free_space() > bytes
    }

    /// Admits `bytes` that are fully written to staging and accounts for them
    /// in one step. `false` means the upload must be discarded.
    fn try_commit(&self, bytes: u64) -> bool;

    /// Accounts for bytes already durably written.
    fn commit(&self, bytes: u64);

    /// Gives back the bytes of a removed file.
    fn release(&self, bytes: u64);

    /// Bytes currently accounted as used.
    fn used(&self) -> u64;

    /// Fixed quota, if this tracker has one.
    fn quota(&self) -> Option<u64>;
}

/// Builds the tracker selected by configuration.
pub fn from_config(config: &ServerConfig, root: PathBuf) -> Arc<dyn QuotaTracker> {
    match config.quota_strategy {
        QuotaStrategy::Counter => Arc::new(CounterQuota::new(root, config.quota_bytes)),
        QuotaStrategy::Disk => Arc::new(DiskQuota::new(root, config.min_free_bytes)),
    }
}
