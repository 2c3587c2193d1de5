//! llama-cpp-2 backend for GGUF models.
//!
//! Bridges the [`InferenceBackend`] primitives to the llama-cpp-2 Rust
//! bindings: model loading, per-call context creation, and the
//! batch/decode/sample loop.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::Path;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::token::LlamaToken;
use tracing::{info, warn};

use super::backend::{ContextHandle, InferenceBackend};
use super::error::EngineError;
use super::params::{EngineConfig, GenerationParams};

/// Production backend over llama.cpp via the llama-cpp-2 bindings.
///
/// The library is probed exactly once at construction; a failed probe marks
/// the backend permanently unavailable for the process lifetime.
pub struct LlamaCppBackend {
    backend: Option<LlamaBackend>,
    config: EngineConfig,
    models: HashMap<u64, LlamaModel>,
    next_id: u64,
}

impl LlamaCppBackend {
    pub fn new(config: EngineConfig) -> Self {
        let backend = match LlamaBackend::init() {
            Ok(b) => Some(b),
            Err(e) => {
                warn!(error = %e, "llama backend init failed; backend unavailable");
                None
            }
        };
        Self {
            backend,
            config,
            models: HashMap::new(),
            next_id: 1,
        }
    }

    fn create_context<'a>(
        &self,
        backend: &'a LlamaBackend,
        model: &'a LlamaModel,
    ) -> Result<LlamaContext<'a>, EngineError> {
        let threads = resolve_threads(self.config.n_threads);
        let params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.config.n_ctx))
            .with_n_threads(threads)
            .with_n_threads_batch(threads);
        model
            .new_context(backend, params)
            .map_err(|e| EngineError::Native(format!("ctx: {e}")))
    }
}

impl InferenceBackend for LlamaCppBackend {
    fn available(&self) -> bool {
        self.backend.is_some()
    }

    fn init(&mut self, path: &Path) -> Result<ContextHandle, EngineError> {
        let backend = self.backend.as_ref().ok_or(EngineError::Unavailable)?;
        let model_params = LlamaModelParams::default();
        let model = LlamaModel::load_from_file(backend, path, &model_params).map_err(|e| {
            EngineError::InitFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        info!(path = %path.display(), bytes = model.size(), "GGUF model loaded");

        let id = self.next_id;
        self.next_id += 1;
        self.models.insert(id, model);
        ContextHandle::from_raw(id).ok_or(EngineError::InitFailed {
            path: path.to_path_buf(),
            reason: "invalid context id".to_string(),
        })
    }

    fn generate(
        &mut self,
        handle: &ContextHandle,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        params.validate()?;
        let backend = self.backend.as_ref().ok_or(EngineError::Unavailable)?;
        let model = self.models.get(&handle.raw()).ok_or(EngineError::NotLoaded)?;

        let tokens = model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| EngineError::Native(format!("tokenize: {e}")))?;

        let mut ctx = self.create_context(backend, model)?;
        let out_tokens = sample_loop(&mut ctx, model, &tokens, params)?;
        detokenize(model, &out_tokens)
    }

    fn release(&mut self, handle: ContextHandle) -> Result<(), EngineError> {
        // Dropping the model frees the native weights.
        self.models.remove(&handle.raw());
        Ok(())
    }
}

fn sample_loop(
    ctx: &mut LlamaContext<'_>,
    model: &LlamaModel,
    tokens: &[LlamaToken],
    params: &GenerationParams,
) -> Result<Vec<LlamaToken>, EngineError> {
    let mut batch = LlamaBatch::new(tokens.len().max(1), 1);
    add_prompt(&mut batch, tokens)?;
    decode(ctx, &mut batch)?;

    let mut sampler = build_sampler(params);
    sampler.accept_many(tokens.iter().copied());

    let mut out = Vec::new();
    let mut pos = tokens.len() as i32;
    for _ in 0..params.max_tokens {
        // -1 samples from the last token with computed logits
        let tok = sampler.sample(ctx, -1);
        sampler.accept(tok);
        if model.is_eog_token(tok) {
            break;
        }
        out.push(tok);
        batch.clear();
        batch
            .add(tok, pos, &[0], true)
            .map_err(|e| EngineError::Native(format!("batch: {e}")))?;
        decode(ctx, &mut batch)?;
        pos += 1;
    }
    Ok(out)
}

fn add_prompt(batch: &mut LlamaBatch, tokens: &[LlamaToken]) -> Result<(), EngineError> {
    let n = tokens.len();
    for (i, &tok) in tokens.iter().enumerate() {
        // Logits only for the final prompt token; that is where sampling starts.
        let logits = i == n - 1;
        batch
            .add(tok, i as i32, &[0], logits)
            .map_err(|e| EngineError::Native(format!("batch: {e}")))?;
    }
    Ok(())
}

fn decode(ctx: &mut LlamaContext<'_>, batch: &mut LlamaBatch) -> Result<(), EngineError> {
    ctx.decode(batch)
        .map_err(|e| EngineError::Native(format!("decode: {e}")))
}

fn build_sampler(params: &GenerationParams) -> LlamaSampler {
    let mut chain = Vec::new();
    if params.repetition_penalty > 1.0 {
        chain.push(LlamaSampler::penalties(
            64,
            params.repetition_penalty,
            0.0,
            0.0,
        ));
    }
    if params.top_k > 0 {
        chain.push(LlamaSampler::top_k(params.top_k as i32));
    }
    chain.push(LlamaSampler::top_p(params.top_p, 1));
    chain.push(LlamaSampler::temp(params.temperature));
    chain.push(LlamaSampler::dist(42));
    LlamaSampler::chain_simple(chain)
}

fn detokenize(model: &LlamaModel, tokens: &[LlamaToken]) -> Result<String, EngineError> {
    let mut decoder = encoding_rs::UTF_8.new_decoder();
    let mut out = String::new();
    for &tok in tokens {
        let piece = model
            .token_to_piece(tok, &mut decoder, false, None)
            .map_err(|e| EngineError::Native(format!("detok: {e}")))?;
        out.push_str(&piece);
    }
    Ok(out)
}

fn resolve_threads(n: u32) -> i32 {
    if n == 0 {
        // Memory-bound workload; all logical cores help, capped to avoid
        // diminishing returns on big hosts.
        let logical = num_cpus::get().clamp(1, 16);
        i32::try_from(logical).unwrap_or(4)
    } else {
        i32::try_from(n).unwrap_or(4)
    }
}
