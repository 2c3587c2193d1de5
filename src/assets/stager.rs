//! Artifact staging: copying the bundled model into writable storage.
//!
//! The copy protocol is crash-safe: bytes are drained into a `.part` file,
//! atomically renamed onto the destination, and a sidecar manifest records
//! the expected size and SHA-256. A destination that does not match its
//! manifest is treated as invalid and re-staged on the next attempt.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use super::source::{AssetSource, SourceError};

/// Subdirectory of the writable data dir that holds staged models.
const STAGING_DIR: &str = "models";

/// Fixed buffer size for the streaming drain.
const COPY_BUF_BYTES: usize = 8192;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to copy artifact to {path}: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write staging manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Staged artifact {path} is truncated: manifest says {expected} bytes, found {actual}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Hash mismatch for staged artifact {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Sidecar record written after a fully completed copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedManifest {
    pub size_bytes: u64,
    pub sha256: String,
}

impl StagedManifest {
    fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write(&self, path: &Path) -> Result<(), StageError> {
        let json = serde_json::to_string(self).map_err(|e| StageError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| StageError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Copies the named model artifact from the resource bundle into writable
/// storage, only when absent, invalid, or a reload is forced.
///
/// No concurrency handling of its own: always invoked from inside the
/// lifecycle manager's critical section.
pub struct ArtifactStager {
    source: Box<dyn AssetSource>,
    data_dir: PathBuf,
    asset_dir: String,
    model_file: String,
}

impl ArtifactStager {
    pub fn new(
        source: Box<dyn AssetSource>,
        data_dir: PathBuf,
        asset_dir: String,
        model_file: String,
    ) -> Self {
        Self {
            source,
            data_dir,
            asset_dir,
            model_file,
        }
    }

    /// Destination path of the staged artifact.
    pub fn destination(&self) -> PathBuf {
        self.data_dir.join(STAGING_DIR).join(&self.model_file)
    }

    fn logical_path(&self) -> String {
        format!("{}/{}", self.asset_dir, self.model_file)
    }

    fn manifest_path(&self) -> PathBuf {
        let dest = self.destination();
        dest.with_file_name(format!("{}.staged.json", self.model_file))
    }

    /// Ensure the artifact is staged, returning its destination path.
    ///
    /// Fast path on every start after the first: destination present and
    /// matching its manifest, no bytes moved.
    pub fn stage(&self, force_reload: bool) -> Result<PathBuf, StageError> {
        let dir = self.data_dir.join(STAGING_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| StageError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;

        let dest = self.destination();
        if !force_reload && self.destination_valid(&dest) {
            debug!(path = %dest.display(), "staged artifact valid, skipping copy");
            return Ok(dest);
        }

        info!(path = %dest.display(), force_reload, "staging model artifact");
        self.copy_artifact(&dest)?;
        Ok(dest)
    }

    /// True iff the destination exists, is non-empty, and matches the size
    /// recorded by the staging manifest.
    pub fn is_staged(&self) -> bool {
        self.destination_valid(&self.destination())
    }

    /// Full SHA-256 re-hash of the staged file against its manifest.
    ///
    /// Expensive for large artifacts; not part of the `stage` fast path.
    pub fn verify(&self) -> Result<(), StageError> {
        let dest = self.destination();
        let manifest = StagedManifest::read(&self.manifest_path()).ok_or_else(|| {
            StageError::Manifest {
                path: self.manifest_path(),
                reason: "missing or unreadable".to_string(),
            }
        })?;

        let mut file = File::open(&dest).map_err(|e| StageError::Copy {
            path: dest.clone(),
            source: e,
        })?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; COPY_BUF_BYTES];
        let mut total: u64 = 0;
        loop {
            let n = file.read(&mut buf).map_err(|e| StageError::Copy {
                path: dest.clone(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            total += n as u64;
        }

        if total != manifest.size_bytes {
            return Err(StageError::Truncated {
                path: dest,
                expected: manifest.size_bytes,
                actual: total,
            });
        }
        let actual = hex::encode(hasher.finalize());
        if actual != manifest.sha256 {
            return Err(StageError::HashMismatch {
                path: dest,
                expected: manifest.sha256,
                actual,
            });
        }
        Ok(())
    }

    fn destination_valid(&self, dest: &Path) -> bool {
        let len = match std::fs::metadata(dest) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return false,
        };
        if len == 0 {
            return false;
        }
        // Size check only on the hot path; a truncated copy from an
        // interrupted stage never matches its manifest.
        match StagedManifest::read(&self.manifest_path()) {
            Some(manifest) => manifest.size_bytes == len,
            None => false,
        }
    }

    fn copy_artifact(&self, dest: &Path) -> Result<(), StageError> {
        let mut reader = self.source.open(&self.logical_path())?;

        let part = dest.with_file_name(format!("{}.part", self.model_file));
        let mut out = File::create(&part).map_err(|e| StageError::Copy {
            path: part.clone(),
            source: e,
        })?;

        let mut hasher = Sha256::new();
        let mut buf = [0u8; COPY_BUF_BYTES];
        let mut total: u64 = 0;
        loop {
            let n = reader.read(&mut buf).map_err(|e| StageError::Copy {
                path: part.clone(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).map_err(|e| StageError::Copy {
                path: part.clone(),
                source: e,
            })?;
            total += n as u64;
        }
        out.sync_all().map_err(|e| StageError::Copy {
            path: part.clone(),
            source: e,
        })?;
        drop(out);

        std::fs::rename(&part, dest).map_err(|e| StageError::Copy {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let manifest = StagedManifest {
            size_bytes: total,
            sha256: hex::encode(hasher.finalize()),
        };
        manifest.write(&self.manifest_path())?;

        info!(path = %dest.display(), bytes = total, "model artifact staged");
        Ok(())
    }
}
