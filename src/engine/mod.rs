//! Native inference engine bridge.
//!
//! [`EngineHandle`] is the exclusive owner of the opaque native context;
//! [`InferenceBackend`] is the seam to the native library itself.

pub mod backend;
pub mod error;
mod handle;
pub mod params;

#[cfg(feature = "gguf")]
pub mod llama;

pub use backend::{ContextHandle, InferenceBackend, UnavailableBackend};
pub use error::EngineError;
pub use handle::EngineHandle;
pub use params::{EngineConfig, GenerationParams};

#[cfg(feature = "gguf")]
pub use llama::LlamaCppBackend;
