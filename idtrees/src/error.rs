//! Distinguished failure conditions.
//!
//! Every fallible function in this crate returns [anyhow::Result]. The
//! conditions a caller may want to react to are wrapped as [IdtreesError]
//! and can be recovered with `error.downcast_ref::<IdtreesError>()`.

use crate::config::Split;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IdtreesError {
    /// The root directory lacks the split and downloading is disabled.
    #[error(
        "dataset not found in '{}' for split '{split}', \
         either specify a different root directory or enable downloading",
        root.display()
    )]
    DatasetNotFound { root: PathBuf, split: Split },
    /// The crate was built without a cargo feature that the operation needs.
    #[error("the '{feature}' feature must be enabled to {purpose}")]
    DependencyMissing {
        feature: &'static str,
        purpose: &'static str,
    },
    #[error("checksum mismatch for '{}': expect {expect}, but found {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expect: String,
        actual: String,
    },
    #[error("unknown species code '{0}'")]
    UnknownSpecies(String),
    #[error("scene '{scene}' has no {modality} file at '{}'", path.display())]
    MissingCompanion {
        scene: String,
        modality: &'static str,
        path: PathBuf,
    },
    #[error("annotation of scene '{scene}' refers to missing crown polygon {id}")]
    MissingGeometry { id: i64, scene: String },
}
