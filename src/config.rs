//! Runtime configuration loading from environment variables.
//!
//! All values are loaded from `POCKET_*` environment variables with safe
//! defaults. Missing or invalid values fall back to defaults without
//! panicking.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `POCKET_DATA_DIR` | `.` | Writable app-private storage root |
//! | `POCKET_MODEL_FILE` | `chat-model-q4_0.gguf` | Model artifact file name |
//! | `POCKET_N_CTX` | 2048 | Context window size (tokens) |
//! | `POCKET_N_THREADS` | 0 | Inference threads (0 = auto) |
//! | `POCKET_MAX_TOKENS` | 256 | Max tokens per response |
//! | `POCKET_TEMPERATURE` | 0.7 | Sampling temperature |

use std::path::PathBuf;

use crate::engine::{EngineConfig, GenerationParams};

/// Logical directory inside the resource bundle that holds model files.
/// Also the staging subdirectory name under the writable data dir.
pub const MODEL_ASSET_DIR: &str = "models";

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Application-private writable storage root.
    pub data_dir: PathBuf,
    /// Logical model directory inside the resource bundle.
    pub asset_dir: String,
    /// Model artifact file name (same in the bundle and the staging dir).
    pub model_file: String,
    pub engine: EngineConfig,
    pub generation: GenerationParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            asset_dir: MODEL_ASSET_DIR.to_string(),
            model_file: "chat-model-q4_0.gguf".to_string(),
            engine: EngineConfig::default(),
            generation: GenerationParams::default(),
        }
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse an `f32` env var, returning `default` on missing or invalid.
fn parse_f32(key: &str, default: f32) -> f32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<f32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Load configuration from environment variables.
pub fn load() -> RuntimeConfig {
    let defaults = RuntimeConfig::default();

    let data_dir = std::env::var("POCKET_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.data_dir);
    let model_file =
        std::env::var("POCKET_MODEL_FILE").unwrap_or(defaults.model_file);

    let n_ctx = parse_u32("POCKET_N_CTX", defaults.engine.n_ctx).max(128);
    let n_threads = parse_u32("POCKET_N_THREADS", defaults.engine.n_threads);

    let max_tokens = parse_u32("POCKET_MAX_TOKENS", defaults.generation.max_tokens).max(1);
    let temperature =
        parse_f32("POCKET_TEMPERATURE", defaults.generation.temperature).max(0.0);

    RuntimeConfig {
        data_dir,
        asset_dir: defaults.asset_dir,
        model_file,
        engine: EngineConfig { n_ctx, n_threads },
        generation: GenerationParams {
            max_tokens,
            temperature,
            ..defaults.generation
        },
    }
}
