//! EngineHandle tests: slot ownership, release semantics, and validity
//! checks in front of every native call.

mod common;

use std::sync::atomic::Ordering;

use common::MockBackend;

use pocket_runtime::engine::{EngineError, EngineHandle, GenerationParams, UnavailableBackend};

fn model_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.gguf");
    std::fs::write(&path, b"weights").unwrap();
    (dir, path)
}

#[test]
fn load_then_generate_round_trip() {
    let (_dir, path) = model_file();
    let (backend, calls, _fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));

    assert!(engine.is_available());
    assert!(!engine.is_loaded());

    engine.load(&path).unwrap();
    assert!(engine.is_loaded());

    let text = engine.generate("hi", &GenerationParams::default()).unwrap();
    assert_eq!(text, "echo: hi");
    assert_eq!(calls.sequence(), vec!["init", "generate"]);
}

#[test]
fn load_releases_previous_context_first() {
    let (_dir, path) = model_file();
    let (backend, calls, _fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));

    engine.load(&path).unwrap();
    engine.load(&path).unwrap();

    assert_eq!(calls.sequence(), vec!["init", "release", "init"]);
    assert_eq!(calls.max_live.load(Ordering::SeqCst), 1);
}

#[test]
fn load_missing_file_fails_with_cleared_slot() {
    let (_dir, path) = model_file();
    let missing = path.with_file_name("nope.gguf");
    let (backend, calls, _fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));

    let err = engine.load(&missing).unwrap_err();
    assert!(matches!(err, EngineError::ModelFileMissing(_)));
    assert!(!engine.is_loaded());
    assert_eq!(calls.total(), 0);
}

#[test]
fn failed_init_leaves_slot_cleared() {
    let (_dir, path) = model_file();
    let (backend, _calls, fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));

    fail.fail_next_init();
    assert!(engine.load(&path).is_err());
    assert!(!engine.is_loaded());

    // And a stale-slot generate is refused locally.
    let err = engine
        .generate("hi", &GenerationParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotLoaded));
}

#[test]
fn generate_failure_keeps_context_in_place() {
    let (_dir, path) = model_file();
    let (backend, calls, fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));
    engine.load(&path).unwrap();

    fail.fail_next_generate();
    let err = engine
        .generate("hi", &GenerationParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::Native(_)));

    // Clearing is the lifecycle manager's decision, not this component's.
    assert!(engine.is_loaded());
    assert_eq!(calls.count("release"), 0);
}

#[test]
fn release_is_idempotent() {
    let (_dir, path) = model_file();
    let (backend, calls, _fail) = MockBackend::new(true);
    let mut engine = EngineHandle::new(Box::new(backend));
    engine.load(&path).unwrap();

    engine.release();
    engine.release();
    engine.release();

    assert!(!engine.is_loaded());
    assert_eq!(calls.count("release"), 1);
    assert_eq!(calls.live.load(Ordering::SeqCst), 0);
}

#[test]
fn stock_unavailable_backend_never_reports_available() {
    let mut engine = EngineHandle::new(Box::new(UnavailableBackend));
    assert!(!engine.is_available());
    assert!(!engine.is_loaded());
    let err = engine
        .generate("hi", &GenerationParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotLoaded));
}

#[test]
fn unavailable_backend_refuses_load() {
    let (_dir, path) = model_file();
    let (backend, calls, _fail) = MockBackend::new(false);
    let mut engine = EngineHandle::new(Box::new(backend));

    assert!(!engine.is_available());
    let err = engine.load(&path).unwrap_err();
    assert!(matches!(err, EngineError::Unavailable));
    assert_eq!(calls.total(), 0);
}
