//! Shared test doubles for the native inference layer.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use pocket_runtime::engine::{ContextHandle, EngineError, GenerationParams, InferenceBackend};
use pocket_runtime::{ChatRuntime, DirAssetSource, RuntimeConfig};

pub const MODEL_FILE: &str = "tiny-chat-q4_0.gguf";

/// Native calls observed by the mock, in order.
#[derive(Default)]
pub struct NativeCalls {
    log: Mutex<Vec<&'static str>>,
    /// Currently valid contexts.
    pub live: AtomicUsize,
    /// High-water mark of simultaneously valid contexts.
    pub max_live: AtomicUsize,
    in_call: AtomicBool,
}

impl NativeCalls {
    fn record(&self, op: &'static str) {
        let was = self.in_call.swap(true, Ordering::SeqCst);
        assert!(!was, "native layer entered concurrently");
        self.log.lock().unwrap().push(op);
        self.in_call.store(false, Ordering::SeqCst);
    }

    pub fn sequence(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|&&o| o == op).count()
    }

    pub fn total(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

/// One-shot failure injection; each flag clears when it fires.
#[derive(Default)]
pub struct FailFlags {
    pub init: AtomicBool,
    pub generate: AtomicBool,
}

impl FailFlags {
    pub fn fail_next_init(&self) {
        self.init.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_generate(&self) {
        self.generate.store(true, Ordering::SeqCst);
    }
}

/// Counting stand-in for the native inference library.
pub struct MockBackend {
    available: bool,
    calls: Arc<NativeCalls>,
    fail: Arc<FailFlags>,
    next_id: u64,
}

impl MockBackend {
    pub fn new(available: bool) -> (Self, Arc<NativeCalls>, Arc<FailFlags>) {
        let calls = Arc::new(NativeCalls::default());
        let fail = Arc::new(FailFlags::default());
        let backend = Self {
            available,
            calls: calls.clone(),
            fail: fail.clone(),
            next_id: 1,
        };
        (backend, calls, fail)
    }
}

impl InferenceBackend for MockBackend {
    fn available(&self) -> bool {
        self.available
    }

    fn init(&mut self, path: &Path) -> Result<ContextHandle, EngineError> {
        self.calls.record("init");
        if self.fail.init.swap(false, Ordering::SeqCst) {
            return Err(EngineError::InitFailed {
                path: path.to_path_buf(),
                reason: "mock init refused".to_string(),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        let live = self.calls.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_live.fetch_max(live, Ordering::SeqCst);
        ContextHandle::from_raw(id).ok_or_else(|| EngineError::Native("zero id".to_string()))
    }

    fn generate(
        &mut self,
        _handle: &ContextHandle,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, EngineError> {
        self.calls.record("generate");
        if self.fail.generate.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Native("mock engine fault".to_string()));
        }
        Ok(format!("echo: {prompt}"))
    }

    fn release(&mut self, _handle: ContextHandle) -> Result<(), EngineError> {
        self.calls.record("release");
        self.calls.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A runtime wired to a mock backend over a temp bundle and data dir.
pub struct TestApp {
    pub runtime: ChatRuntime,
    pub calls: Arc<NativeCalls>,
    pub fail: Arc<FailFlags>,
    pub data_dir: PathBuf,
    pub staged_model: PathBuf,
    _dirs: TempDir,
}

pub fn app(model_bytes: &[u8], available: bool) -> TestApp {
    let dirs = tempfile::tempdir().unwrap();
    let bundle = dirs.path().join("bundle");
    std::fs::create_dir_all(bundle.join("models")).unwrap();
    std::fs::write(bundle.join("models").join(MODEL_FILE), model_bytes).unwrap();
    let data_dir = dirs.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();

    let config = RuntimeConfig {
        data_dir: data_dir.clone(),
        model_file: MODEL_FILE.to_string(),
        ..Default::default()
    };
    let (backend, calls, fail) = MockBackend::new(available);
    let runtime = ChatRuntime::new(
        config,
        Box::new(DirAssetSource::new(bundle)),
        Box::new(backend),
    );
    TestApp {
        runtime,
        calls,
        fail,
        staged_model: data_dir.join("models").join(MODEL_FILE),
        data_dir,
        _dirs: dirs,
    }
}
