//! Application state
//!
//! Everything the handlers share, injected through axum's `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::quota::QuotaTracker;
use crate::storage::VaultRoot;
use crate::transfer::{UploadLimits, UploadPipeline};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: VaultRoot,
    pub quota: Arc<dyn QuotaTracker>,
    pub pipeline: Arc<UploadPipeline>,
    pub page_size: usize,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(root: VaultRoot, quota: Arc<dyn QuotaTracker>, config: &ServerConfig) -> Self {
        let limits = UploadLimits {
            max_upload_bytes: config.max_upload_bytes,
            chunk_bytes: config.upload_chunk_bytes,
        };
        let pipeline = Arc::new(UploadPipeline::new(root.clone(), quota.clone(), limits));
        Self {
            root,
            quota,
            pipeline,
            page_size: config.page_size,
            static_dir: config.static_path(),
        }
    }
}
