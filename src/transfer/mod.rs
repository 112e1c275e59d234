//! Transfer module
//!
//! Streamed uploads into staging artifacts with atomic commit.

pub mod results;
pub mod staging;
pub mod upload;

pub use results::{CommitResult, UploadRequest};
pub use staging::StagingFile;
pub use upload::{UploadLimits, UploadPipeline};
