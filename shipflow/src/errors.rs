//! Error types for the shipflow release pipeline.
//!
//! The taxonomy distinguishes recoverable conditions (an uninstalled
//! toolchain candidate) from fatal ones (a violated stage contract or a
//! failed external tool). Fatal errors halt the run; recoverable errors
//! are logged and the surrounding iteration continues.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for shipflow operations.
#[derive(Debug, Error)]
pub enum ShipflowError {
    /// A toolchain candidate could not be probed. Recoverable: the
    /// candidate is skipped and the outer iteration continues.
    #[error("Toolchain '{command}' not available: {reason}")]
    ToolchainUnavailable {
        /// The invocation command of the candidate.
        command: String,
        /// Why the probe failed.
        reason: String,
    },

    /// An artifact a prior stage was contracted to produce is absent.
    #[error("Missing artifact for stage '{stage}': {}", path.display())]
    MissingArtifact {
        /// The stage whose contract was violated.
        stage: String,
        /// The absent path.
        path: PathBuf,
    },

    /// An external tool exited unsuccessfully or could not be spawned.
    #[error("Tool '{tool}' failed: {detail}")]
    ToolFailure {
        /// The tool name.
        tool: String,
        /// Exit status or spawn diagnostic.
        detail: String,
    },

    /// Compressing or relocating a package archive failed.
    #[error("Archive error for package '{package}': {detail}")]
    Archive {
        /// The package being archived.
        package: String,
        /// What went wrong.
        detail: String,
    },

    /// The run configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShipflowError {
    /// Creates a toolchain-unavailable error.
    #[must_use]
    pub fn toolchain_unavailable(
        command: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ToolchainUnavailable {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-artifact error.
    #[must_use]
    pub fn missing_artifact(stage: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingArtifact {
            stage: stage.into(),
            path: path.into(),
        }
    }

    /// Creates a tool-failure error.
    #[must_use]
    pub fn tool_failure(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ToolFailure {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Creates an archive error.
    #[must_use]
    pub fn archive(package: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Archive {
            package: package.into(),
            detail: detail.into(),
        }
    }

    /// Returns true if the error skips the current candidate rather than
    /// halting the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ToolchainUnavailable { .. })
    }
}

/// A non-fatal observation surfaced to the operator.
///
/// Warnings never abort a run. They exist for the best-effort paths
/// (image recompression) and for drift between fixed expectation tables
/// and what an external generator actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipflowWarning {
    /// A file was found on disk that the fixed expectation table does
    /// not mention.
    ConfigurationDrift {
        /// The unexpected file.
        path: PathBuf,
    },

    /// A best-effort operation on a single file failed.
    BestEffortFailure {
        /// The file the operation targeted.
        path: PathBuf,
        /// The failure diagnostic.
        detail: String,
    },
}

impl std::fmt::Display for ShipflowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigurationDrift { path } => write!(
                f,
                "file not covered by the expectation table: '{}'",
                path.display()
            ),
            Self::BestEffortFailure { path, detail } => {
                write!(f, "operation failed for '{}': {}", path.display(), detail)
            }
        }
    }
}
