//! Backend abstraction over the native inference library.

use std::num::NonZeroU64;
use std::path::Path;

use super::error::EngineError;
use super::params::GenerationParams;

/// Opaque identifier for a loaded native model context.
///
/// Deliberately neither `Copy` nor `Clone`: exactly one owner holds a live
/// handle, and `release` consumes it, so a released handle cannot be
/// presented to the native layer again.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(NonZeroU64);

impl ContextHandle {
    /// Wrap a raw native id. Zero is the native layer's invalid sentinel.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn raw(&self) -> u64 {
        self.0.get()
    }
}

/// The native library's three primitives, plus link-time availability.
///
/// Implementations are free to fail any call; the caller converts every
/// failure into a typed [`EngineError`] and never lets it propagate as a
/// panic.
pub trait InferenceBackend: Send {
    /// True iff the native library linked at process start. Computed once;
    /// a link failure is permanent for the process lifetime.
    fn available(&self) -> bool;

    /// Create a native context for the model at `path`.
    fn init(&mut self, path: &Path) -> Result<ContextHandle, EngineError>;

    /// Run one generation against an existing context.
    fn generate(
        &mut self,
        handle: &ContextHandle,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError>;

    /// Destroy a context. Consumes the handle.
    fn release(&mut self, handle: ContextHandle) -> Result<(), EngineError>;
}

/// Stand-in backend used when the crate is built without a native engine.
pub struct UnavailableBackend;

impl InferenceBackend for UnavailableBackend {
    fn available(&self) -> bool {
        false
    }

    fn init(&mut self, _path: &Path) -> Result<ContextHandle, EngineError> {
        Err(EngineError::Unavailable)
    }

    fn generate(
        &mut self,
        _handle: &ContextHandle,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, EngineError> {
        Err(EngineError::Unavailable)
    }

    fn release(&mut self, _handle: ContextHandle) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }
}
