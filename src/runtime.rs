//! Runtime lifecycle manager.
//!
//! The single serialized entry point that owns artifact staging, the
//! `initialized` flag, and every operation against the native context.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assets::{ArtifactStager, AssetSource};
use crate::config::RuntimeConfig;
use crate::engine::{EngineHandle, GenerationParams, InferenceBackend};

/// Outcome of an initialize call, marshaled back across the bridge as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl InitResult {
    fn ok(model_path: PathBuf) -> Self {
        Self {
            success: true,
            message: "Model initialized successfully".to_string(),
            model_path: Some(model_path),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            model_path: None,
        }
    }
}

/// Outcome of a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl GenerationResult {
    fn ok(response: String) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            response: Some(response),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            response: None,
        }
    }
}

/// Cheap readiness probe for the host UI's status indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub library_available: bool,
    pub initialized: bool,
    pub model_loaded: bool,
    pub model_path: Option<PathBuf>,
}

struct RuntimeInner {
    initialized: bool,
    staged_path: Option<PathBuf>,
    stager: ArtifactStager,
    engine: EngineHandle,
    generation: GenerationParams,
}

/// Process-wide lifecycle manager for the single model slot.
///
/// Create one instance at startup and share it by reference. Every public
/// operation runs under one coarse critical section covering staging I/O
/// and all handle operations, so initialize and generate calls are strictly
/// serialized: no generation can observe a context mid-load and no two
/// loads can race.
pub struct ChatRuntime {
    inner: Mutex<RuntimeInner>,
}

impl ChatRuntime {
    pub fn new(
        config: RuntimeConfig,
        source: Box<dyn AssetSource>,
        backend: Box<dyn InferenceBackend>,
    ) -> Self {
        let stager = ArtifactStager::new(
            source,
            config.data_dir,
            config.asset_dir,
            config.model_file,
        );
        Self {
            inner: Mutex::new(RuntimeInner {
                initialized: false,
                staged_path: None,
                stager,
                engine: EngineHandle::new(backend),
                generation: config.generation,
            }),
        }
    }

    /// Construct with the production llama.cpp backend.
    #[cfg(feature = "gguf")]
    pub fn with_llama_backend(config: RuntimeConfig, source: Box<dyn AssetSource>) -> Self {
        let backend = crate::engine::LlamaCppBackend::new(config.engine.clone());
        Self::new(config, source, Box::new(backend))
    }

    /// Stage the artifact if needed and ensure a native context is loaded.
    ///
    /// Idempotent under repeated non-forcing calls: once ready, only the
    /// cheap staging validity check runs and the native context is not
    /// touched again. `force_reload` re-copies the artifact and goes
    /// through a full release-then-load cycle.
    pub fn initialize_model(&self, force_reload: bool) -> InitResult {
        let mut inner = self.inner.lock();

        if !inner.engine.is_available() {
            return InitResult::fail(
                "Native inference library is not available on this device",
            );
        }

        let path = match inner.stager.stage(force_reload) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "artifact staging failed");
                return InitResult::fail(format!("Failed to stage model artifact: {e}"));
            }
        };

        if !path.is_file() {
            return InitResult::fail(format!(
                "Model artifact missing after staging: {}",
                path.display()
            ));
        }

        if force_reload {
            info!("forced reload: releasing current context");
            inner.engine.release();
            inner.initialized = false;
        }

        if !inner.engine.is_loaded() {
            if let Err(e) = inner.engine.load(&path) {
                warn!(error = %e, "model load failed");
                return InitResult::fail(format!("Failed to load model: {e}"));
            }
        }

        inner.initialized = true;
        inner.staged_path = Some(path.clone());
        info!(path = %path.display(), "model initialized");
        InitResult::ok(path)
    }

    /// Run one prompt/response exchange against the loaded model.
    ///
    /// Readiness is re-checked on every call (`initialized` flag and the
    /// handle's own loaded state), not cached.
    pub fn generate_response(&self, prompt: &str) -> GenerationResult {
        if prompt.trim().is_empty() {
            return GenerationResult::fail("No message provided");
        }

        let mut inner = self.inner.lock();
        if !inner.initialized || !inner.engine.is_loaded() {
            return GenerationResult::fail(
                "Model not initialized - call initialize_model first",
            );
        }

        let params = inner.generation.clone();
        match inner.engine.generate(prompt, &params) {
            Ok(text) => GenerationResult::ok(text),
            Err(e) => {
                // Demotion: one failed generation forces the next initialize
                // call to re-validate the context before any further use.
                inner.initialized = false;
                warn!(error = %e, "generation failed; runtime demoted");
                GenerationResult::fail(format!("Generation failed: {e}"))
            }
        }
    }

    /// Current readiness snapshot.
    pub fn status(&self) -> RuntimeStatus {
        let inner = self.inner.lock();
        RuntimeStatus {
            library_available: inner.engine.is_available(),
            initialized: inner.initialized,
            model_loaded: inner.engine.is_loaded(),
            model_path: inner.staged_path.clone(),
        }
    }
}
