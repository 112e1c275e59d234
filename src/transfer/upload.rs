//! Streamed uploads
//!
//! [`UploadPipeline`] turns a request body into a committed file:
//! limit and quota pre-checks, target validation, streaming into a staging
//! artifact, then an authoritative quota check and an atomic rename.

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use log::{info, warn};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::io::StreamReader;

use crate::error::{VaultError, VaultResult};
use crate::quota::QuotaTracker;
use crate::storage::validation::{VaultRoot, sanitize_filename};
use crate::transfer::results::{CommitResult, UploadRequest};
use crate::transfer::staging::StagingFile;

/// Size limits applied to every upload
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Largest body accepted, in bytes
    pub max_upload_bytes: u64,
    /// Read buffer size while streaming
    pub chunk_bytes: usize,
}

pub struct UploadPipeline {
    root: VaultRoot,
    quota: Arc<dyn QuotaTracker>,
    limits: UploadLimits,
    // Serializes the final collision re-check, quota admission and rename of
    // concurrent uploads. Never held while streaming.
    commit_gate: Mutex<()>,
}

impl UploadPipeline {
    pub fn new(root: VaultRoot, quota: Arc<dyn QuotaTracker>, limits: UploadLimits) -> Self {
        Self {
            root,
            quota,
            limits,
            commit_gate: Mutex::new(()),
        }
    }

    /// Streams `body` into a new file described by `request`.
    ///
    /// On any error the staging artifact is gone and the quota is untouched.
    pub async fn handle_upload<S, E>(
        &self,
        request: UploadRequest,
        body: S,
    ) -> VaultResult<CommitResult>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        // Cheap rejection before touching disk. Advisory only: the length may
        // be missing or wrong, and other uploads may commit meanwhile.
        if let Some(declared) = request.content_length {
            if declared > self.limits.max_upload_bytes {
                return Err(VaultError::PayloadTooLarge {
                    limit: self.limits.max_upload_bytes,
                });
            }
            let free = self.quota.free_space();
            if declared > 0 && free < declared {
                return Err(VaultError::QuotaExceeded {
                    needed: declared,
                    free,
                });
            }
        }

        let raw_name = request
            .filename
            .as_deref()
            .ok_or_else(|| VaultError::InvalidRequest("Filename header missing".into()))?;
        let filename = sanitize_filename(raw_name)?;

        let upload_dir = self.root.resolve(&request.upload_path)?;
        fs::create_dir_all(&upload_dir).await.map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => {
                VaultError::InvalidRequest("Upload path is not a directory".into())
            }
            _ => VaultError::from_write(e, 0),
        })?;

        let final_path = upload_dir.join(&filename);
        if path_taken(&final_path).await {
            return Err(VaultError::Conflict("File already exists".into()));
        }

        let (staging, file) = StagingFile::create(&final_path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                VaultError::Conflict("Upload of this file already in progress".into())
            } else {
                VaultError::from_write(e, 0)
            }
        })?;

        let size = self.stream_to_staging(file, body, staging.path()).await?;

        let _gate = self.commit_gate.lock().await;
        self.commit_staged(staging, &final_path, size)?;

        let path = self.root.relative(&final_path);
        info!("✓ {} ({} bytes)", path, size);
        Ok(CommitResult { path, size })
    }

    /// Copies the body into the staging file through a fixed-size buffer and
    /// returns the durable size of what was written.
    async fn stream_to_staging<S, E>(
        &self,
        mut file: File,
        body: S,
        staging: &Path,
    ) -> VaultResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut reader = StreamReader::new(body.map_err(io::Error::other));
        let mut buffer = vec![0u8; self.limits.chunk_bytes];
        let mut received = 0u64;

        loop {
            let n = reader.read(&mut buffer).await.map_err(|e| {
                warn!("Upload stream for {} broke off: {}", staging.display(), e);
                VaultError::InvalidRequest("Upload interrupted".into())
            })?;
            if n == 0 {
                break;
            }

            received += n as u64;
            if received > self.limits.max_upload_bytes {
                return Err(VaultError::PayloadTooLarge {
                    limit: self.limits.max_upload_bytes,
                });
            }

            file.write_all(&buffer[..n])
                .await
                .map_err(|e| VaultError::from_write(e, received))?;
        }

        file.flush()
            .await
            .map_err(|e| VaultError::from_write(e, received))?;
        file.sync_all()
            .await
            .map_err(|e| VaultError::from_write(e, received))?;

        Ok(file.metadata().await?.len())
    }

    /// Collision re-check, quota admission and rename in one step.
    ///
    /// Contains no await point: once the bytes are admitted, the rename or
    /// the release runs to completion even if the request is cancelled.
    fn commit_staged(&self, staging: StagingFile, final_path: &Path, size: u64) -> VaultResult<()> {
        if final_path.symlink_metadata().is_ok() {
            return Err(VaultError::Conflict("File already exists".into()));
        }
        if !self.quota.try_commit(size) {
            let free = self.quota.free_space();
            warn!(
                "Rejected {} after streaming: {} bytes, {} free",
                final_path.display(),
                size,
                free
            );
            return Err(VaultError::QuotaExceeded { needed: size, free });
        }
        if let Err(e) = staging.persist(final_path) {
            self.quota.release(size);
            return Err(VaultError::Internal(e));
        }
        Ok(())
    }
}

async fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}
