//! Exclusive owner of the native context slot.
//!
//! Every method re-checks slot validity before touching the native layer,
//! so no caller can present a stale or double-released handle to it.

use std::path::Path;

use tracing::{debug, info, warn};

use super::backend::{ContextHandle, InferenceBackend};
use super::error::EngineError;
use super::params::GenerationParams;

/// Owns at most one valid native context at a time.
pub struct EngineHandle {
    backend: Box<dyn InferenceBackend>,
    available: bool,
    context: Option<ContextHandle>,
}

impl EngineHandle {
    pub fn new(backend: Box<dyn InferenceBackend>) -> Self {
        let available = backend.available();
        if !available {
            warn!("native inference library unavailable; generation disabled");
        }
        Self {
            backend,
            available,
            context: None,
        }
    }

    /// Whether the native library linked at process start.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether a valid context currently exists.
    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    /// Load a model context from a staged artifact.
    ///
    /// Any pre-existing context is released first, so no handle leaks
    /// across reloads. On failure the slot is left cleared.
    pub fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.release();

        if !self.available {
            return Err(EngineError::Unavailable);
        }
        if !path.is_file() {
            return Err(EngineError::ModelFileMissing(path.to_path_buf()));
        }

        let handle = self.backend.init(path)?;
        info!(path = %path.display(), id = handle.raw(), "native context loaded");
        self.context = Some(handle);
        Ok(())
    }

    /// Run one generation against the loaded context.
    ///
    /// Native failures are re-signaled as [`EngineError::Native`]. The
    /// context is left in place on failure; whether to force a reload is
    /// the lifecycle manager's call, not this component's.
    pub fn generate(
        &mut self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        let handle = self.context.as_ref().ok_or(EngineError::NotLoaded)?;
        self.backend.generate(handle, prompt, params).map_err(|e| {
            warn!(error = %e, "native generation failed");
            match e {
                EngineError::Native(msg) => EngineError::Native(msg),
                other => EngineError::Native(other.to_string()),
            }
        })
    }

    /// Release the current context, if any.
    ///
    /// Never fails and is safe on an already-cleared slot: a native release
    /// error is logged, swallowed, and the slot cleared regardless.
    pub fn release(&mut self) {
        if let Some(handle) = self.context.take() {
            let id = handle.raw();
            match self.backend.release(handle) {
                Ok(()) => debug!(id, "native context released"),
                Err(e) => warn!(id, error = %e, "native release failed; slot cleared anyway"),
            }
        }
    }
}
