//! Pocket Runtime
//!
//! An offline, on-device LLM chat runtime for resource-constrained client
//! devices. Stages a bundled GGUF model artifact into writable storage,
//! manages the load/unload lifecycle of a single native inference context,
//! and serializes prompt/response exchanges against it.
//!
//! # Design
//!
//! - **One model slot**: at most one valid native context exists at any
//!   time; reloads release before they recreate.
//! - **Serialized access**: every public operation on [`ChatRuntime`] runs
//!   under one coarse critical section. Loads and generations are slow and
//!   infrequent; correctness over throughput.
//! - **No fault escapes**: every native-layer failure is caught and turned
//!   into a structured result for the host bridge.
//! - **Crash-safe staging**: the artifact copy is `.part` + rename with a
//!   size/SHA-256 sidecar manifest, so an interrupted copy is detected and
//!   retried, never trusted.
//!
//! The host application's bridge transport (how calls arrive and replies
//! return) is out of scope; [`ChatRuntime::initialize_model`] and
//! [`ChatRuntime::generate_response`] are the two call shapes it consumes.

pub mod assets;
pub mod config;
pub mod engine;
pub mod runtime;
pub mod telemetry;

pub use assets::{ArtifactStager, AssetSource, DirAssetSource, SourceError, StageError};
pub use config::RuntimeConfig;
pub use engine::{
    ContextHandle, EngineConfig, EngineError, EngineHandle, GenerationParams, InferenceBackend,
};
pub use runtime::{ChatRuntime, GenerationResult, InitResult, RuntimeStatus};
pub use telemetry::{init_logging, LogConfig, LogError, LogFormat};
