//! Build artifacts produced by pipeline stages.

use crate::errors::ShipflowError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file produced by a stage and consumed by a later one.
///
/// An artifact is owned by its producing stage until the packaging stage
/// consumes it. Consumers verify existence before use; an absent
/// artifact means the producing stage violated its contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Path of the produced file or directory.
    pub path: PathBuf,
    /// Name of the stage that produced it.
    pub produced_by: String,
}

impl BuildArtifact {
    /// Creates a new artifact record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, produced_by: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            produced_by: produced_by.into(),
        }
    }

    /// Returns true if the artifact currently exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Verifies the artifact exists, naming the producing stage on
    /// violation.
    pub fn verify(&self) -> Result<(), ShipflowError> {
        if self.exists() {
            Ok(())
        } else {
            Err(ShipflowError::missing_artifact(
                self.produced_by.clone(),
                self.path.clone(),
            ))
        }
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
