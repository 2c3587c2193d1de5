//! Engine error types.
//!
//! Every native-layer fault is captured and re-signaled as one of these;
//! nothing from the foreign library crosses the engine boundary unhandled.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The native inference library did not link at process start.
    /// Permanent for the process lifetime; re-probing is not supported.
    #[error("Native inference library is not available")]
    Unavailable,

    #[error("Model file not found: {0}")]
    ModelFileMissing(PathBuf),

    #[error("Native initialization failed for {path}: {reason}")]
    InitFailed { path: PathBuf, reason: String },

    #[error("No model context is loaded")]
    NotLoaded,

    #[error("Native engine failure: {0}")]
    Native(String),

    #[error("Invalid generation parameters: {0}")]
    InvalidParams(String),
}
