use log::{info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::error::VaultResult;
use crate::quota::QuotaTracker;
use crate::quota::scan::used_bytes;

/// In-memory usage counter against a fixed quota.
///
/// Single-process only: the counter lives in this process's memory, so a
/// second process serving the same root would keep its own count and both
/// would overrun the quota. Replace it with a shared store behind the same
/// trait before running several workers.
#[derive(Debug)]
pub struct CounterQuota {
    root: PathBuf,
    quota: u64,
    // Held only for arithmetic, never across I/O.
    used: Mutex<u64>,
}

impl CounterQuota {
    pub fn new(root: PathBuf, quota: u64) -> Self {
        Self {
            root,
            quota,
            used: Mutex::new(0),
        }
    }
}

impl QuotaTracker for CounterQuota {
    fn initialize(&self) -> VaultResult<u64> {
        let scanned = used_bytes(&self.root)?;
        *self.used.lock() = scanned;

        if scanned > self.quota {
            warn!(
                "Existing files ({} bytes) already exceed the quota ({} bytes); uploads are refused until space is freed",
                scanned, self.quota
            );
        } else {
            info!("Storage baseline: {} of {} bytes used", scanned, self.quota);
        }
        Ok(scanned)
    }

    fn free_space(&self) -> u64 {
        self.quota.saturating_sub(*self.used.lock())
    }

    fn try_commit(&self, bytes: u64) -> bool {
        let mut used = self.used.lock();
        if bytes > self.quota.saturating_sub(*used) {
            return false;
        }
        *used += bytes;
        true
    }

    fn commit(&self, bytes: u64) {
        let mut used = self.used.lock();
        *used = used.saturating_add(bytes);
    }

    fn release(&self, bytes: u64) {
        let mut used = self.used.lock();
        *used = used.saturating_sub(bytes);
    }

    fn used(&self) -> u64 {
        *self.used.lock()
    }

    fn quota(&self) -> Option<u64> {
        Some(self.quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn tracker(quota: u64) -> (tempfile::TempDir, CounterQuota) {
        let temp = tempfile::tempdir().unwrap();
        let tracker = CounterQuota::new(temp.path().to_path_buf(), quota);
        (temp, tracker)
    }

    #[test]
    fn test_initialize_scans_root() {
        let (temp, tracker) = tracker(1000);
        std::fs::write(temp.path().join("a"), vec![1u8; 250]).unwrap();

        assert_eq!(tracker.initialize().unwrap(), 250);
        assert_eq!(tracker.used(), 250);
        assert_eq!(tracker.free_space(), 750);
    }

    #[test]
    fn test_commit_and_release() {
        let (_temp, tracker) = tracker(1000);
        tracker.commit(600);
        assert_eq!(tracker.free_space(), 400);

        tracker.release(100);
        assert_eq!(tracker.used(), 500);

        tracker.release(10_000);
        assert_eq!(tracker.used(), 0);
        assert_eq!(tracker.free_space(), 1000);
    }

    #[test]
    fn test_try_commit_boundary() {
        let (_temp, tracker) = tracker(1000);
        assert!(tracker.try_commit(600));
        assert!(!tracker.try_commit(401));
        assert_eq!(tracker.used(), 600);
        assert!(tracker.try_commit(400));
        assert_eq!(tracker.free_space(), 0);
        assert!(!tracker.try_commit(1));
        assert!(tracker.try_commit(0));
    }

    #[test]
    fn test_reserve_hint_is_strict() {
        let (_temp, tracker) = tracker(1000);
        tracker.commit(600);
        assert!(tracker.reserve_hint(399));
        assert!(!tracker.reserve_hint(400));
    }

    #[test]
    fn test_free_space_never_underflows() {
        let (_temp, tracker) = tracker(100);
        tracker.commit(150);
        assert_eq!(tracker.free_space(), 0);
        assert!(!tracker.reserve_hint(0));
    }

    #[test]
    fn test_concurrent_try_commit_never_exceeds_quota() {
        let temp = tempfile::tempdir().unwrap();
        let tracker = Arc::new(CounterQuota::new(temp.path().to_path_buf(), 10_000));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || (0..100).filter(|_| tracker.try_commit(7)).count() as u64)
            })
            .collect();
        let admitted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(admitted * 7, tracker.used());
        assert!(tracker.used() <= 10_000);
        assert_eq!(admitted, 10_000 / 7);
    }

    #[test]
    fn test_concurrent_commit_release_no_lost_updates() {
        let temp = tempfile::tempdir().unwrap();
        let tracker = Arc::new(CounterQuota::new(temp.path().to_path_buf(), u64::MAX));
        tracker.commit(1_000_000);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            tracker.commit(3);
                        } else {
                            tracker.release(3);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.used(), 1_000_000);
    }
}
