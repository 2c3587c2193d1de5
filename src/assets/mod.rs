//! Bundled resource access and model artifact staging.

mod source;
mod stager;

pub use source::{AssetSource, DirAssetSource, SourceError};
pub use stager::{ArtifactStager, StageError, StagedManifest};
