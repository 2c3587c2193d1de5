//! Read-only access to the application's bundled resource store.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Bundled resource not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-stream access to the read-only resource bundle, keyed by logical
/// path (e.g. `models/tiny-chat-q4.gguf`).
pub trait AssetSource: Send + Sync {
    fn open(&self, logical_path: &str) -> Result<Box<dyn Read + Send>, SourceError>;
}

/// Resource bundle unpacked into a plain directory tree.
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl AssetSource for DirAssetSource {
    fn open(&self, logical_path: &str) -> Result<Box<dyn Read + Send>, SourceError> {
        let path = self.root.join(logical_path);
        if !path.is_file() {
            return Err(SourceError::NotFound(logical_path.to_string()));
        }
        Ok(Box::new(File::open(path)?))
    }
}
