//! Engine and sampling configuration.

use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Native context creation settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Context window size in tokens.
    pub n_ctx: u32,
    /// Inference threads (0 = auto-detect).
    pub n_threads: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_ctx: 2048,
            n_threads: 0,
        }
    }
}

/// Per-call sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    /// Temperature for sampling (0.0 = deterministic).
    pub temperature: f32,
    /// Top-p (nucleus) sampling threshold (0.0-1.0).
    pub top_p: f32,
    /// Top-k sampling limit (0 = disabled).
    pub top_k: u32,
    /// Repetition penalty (1.0 = none, >1.0 = penalize repeats).
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repetition_penalty: 1.1,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_tokens == 0 {
            return Err(EngineError::InvalidParams("max_tokens must be > 0".into()));
        }
        if self.temperature < 0.0 {
            return Err(EngineError::InvalidParams(
                "temperature must be >= 0".into(),
            ));
        }
        if self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(EngineError::InvalidParams("top_p must be in (0, 1]".into()));
        }
        Ok(())
    }
}
