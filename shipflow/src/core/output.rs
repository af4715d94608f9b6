//! Stage output type with factory methods.

use super::{BuildArtifact, StageStatus};
use crate::errors::ShipflowWarning;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The output of a stage execution.
///
/// `StageOutput` is immutable once created and provides factory methods
/// for the statuses a stage can report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Artifacts produced by the stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<BuildArtifact>,

    /// Non-fatal warnings collected while the stage ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<ShipflowWarning>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Error message (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

fn serialize_warnings<S>(warnings: &[ShipflowWarning], s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.collect_seq(warnings.iter().map(std::string::ToString::to_string))
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok()
    }
}

impl StageOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: StageStatus::Ok,
            artifacts: Vec::new(),
            warnings: Vec::new(),
            metadata: HashMap::new(),
            error: None,
            skip_reason: None,
        }
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            artifacts: Vec::new(),
            warnings: Vec::new(),
            metadata: HashMap::new(),
            error: None,
            skip_reason: Some(reason.into()),
        }
    }

    /// Creates a failure output with an error message.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Fail,
            artifacts: Vec::new(),
            warnings: Vec::new(),
            metadata: HashMap::new(),
            error: Some(error.into()),
            skip_reason: None,
        }
    }

    /// Adds artifacts to the output.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<BuildArtifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Adds warnings to the output.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<ShipflowWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the output indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the output indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}
