//! Utility functions
//!
//! Formatting helpers shared by the listing and the HTTP layer.

pub mod format;

pub use format::{content_disposition, human_size};
