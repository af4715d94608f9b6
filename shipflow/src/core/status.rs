//! Stage status values.

use serde::{Deserialize, Serialize};

/// The outcome status of a stage execution.
///
/// There is deliberately no retry status: the pipeline never retries,
/// and an operator interrupt is reported as a plain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// The stage completed successfully.
    Ok,
    /// The stage was skipped by configuration.
    Skip,
    /// The stage failed; the run halts.
    Fail,
}

impl StageStatus {
    /// Returns true for statuses that let the pipeline continue.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true for statuses that halt the pipeline.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Fail)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Skip => "skip",
            Self::Fail => "fail",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_and_skip_are_success() {
        assert!(StageStatus::Ok.is_success());
        assert!(StageStatus::Skip.is_success());
        assert!(!StageStatus::Fail.is_success());
    }

    #[test]
    fn only_fail_is_failure() {
        assert!(StageStatus::Fail.is_failure());
        assert!(!StageStatus::Ok.is_failure());
    }

    #[test]
    fn display_matches_serde_casing() {
        assert_eq!(StageStatus::Fail.to_string(), "fail");
        let json = serde_json::to_string(&StageStatus::Fail).unwrap();
        assert_eq!(json, "\"fail\"");
    }
}
