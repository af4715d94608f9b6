//! Toolchain candidate probing.

use crate::config::ToolchainConfig;
use crate::errors::ShipflowError;
use crate::tools::{catalog, ToolInvocation, ToolRunner};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One usable build toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainVersion {
    /// Invocation command of the build-file generator.
    pub command: String,
    /// Version string captured from the probe, if any was printed.
    pub version: Option<String>,
}

impl ToolchainVersion {
    /// Creates a toolchain record.
    #[must_use]
    pub fn new(command: impl Into<String>, version: Option<String>) -> Self {
        Self {
            command: command.into(),
            version,
        }
    }
}

/// Probes toolchain candidates.
///
/// An unavailable candidate is a recoverable, per-candidate condition:
/// the locator reports it and the caller continues with the next one.
/// An empty candidate set with no override is a fatal configuration
/// error.
#[derive(Debug, Clone)]
pub struct ToolchainLocator {
    candidates: Vec<String>,
    version_flag: String,
}

impl ToolchainLocator {
    /// Creates a locator from the toolchain configuration, applying an
    /// optional numeric override that replaces the candidate list with
    /// a single entry.
    pub fn from_config(
        config: &ToolchainConfig,
        override_version: Option<u32>,
    ) -> Result<Self, ShipflowError> {
        let candidates = match override_version {
            Some(n) => vec![format!("qmake{n}")],
            None => config.candidates.clone(),
        };
        if candidates.is_empty() {
            return Err(ShipflowError::Config(
                "no toolchain candidates declared and no override given".to_string(),
            ));
        }
        Ok(Self {
            candidates,
            version_flag: config.version_flag.clone(),
        })
    }

    /// Returns the candidate commands in probe order.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Probes a single candidate.
    ///
    /// The version string is the first informative stdout line: for
    /// qmake-style tools the first line names the generator itself and
    /// the second names the runtime version, so the second non-empty
    /// line is preferred when present.
    pub async fn probe(
        &self,
        runner: &dyn ToolRunner,
        command: &str,
        work_dir: &Path,
    ) -> Result<ToolchainVersion, ShipflowError> {
        if which::which(command).is_err() {
            return Err(ShipflowError::toolchain_unavailable(
                command,
                "not found on PATH",
            ));
        }

        let invocation = ToolInvocation::new(
            catalog::version_probe(command, self.version_flag.clone()),
            work_dir,
        )
        .capture_stdout();

        let output = runner.run(&invocation).await.map_err(|e| {
            ShipflowError::toolchain_unavailable(command, e.to_string())
        })?;
        if !output.success() {
            return Err(ShipflowError::toolchain_unavailable(
                command,
                format!("version probe failed ({})", output.describe_exit()),
            ));
        }

        let informative: Vec<&str> = output
            .stdout_lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        let version = informative
            .get(1)
            .or_else(|| informative.first())
            .map(std::string::ToString::to_string);

        Ok(ToolchainVersion::new(command, version))
    }

    /// Probes all candidates, returning the usable ones in order.
    ///
    /// Unavailable candidates are logged informationally and skipped;
    /// this never produces a fatal error.
    pub async fn locate_all(
        &self,
        runner: &dyn ToolRunner,
        work_dir: &Path,
    ) -> Vec<ToolchainVersion> {
        let mut located = Vec::new();
        for candidate in &self.candidates {
            match self.probe(runner, candidate, work_dir).await {
                Ok(toolchain) => {
                    info!(
                        command = %toolchain.command,
                        version = toolchain.version.as_deref().unwrap_or("unknown"),
                        "toolchain located"
                    );
                    located.push(toolchain);
                }
                Err(err) => {
                    info!(command = %candidate, reason = %err, "toolchain skipped");
                }
            }
        }
        located
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::testing::ScriptedRunner;

    fn locator(candidates: &[&str]) -> ToolchainLocator {
        let config = ToolchainConfig {
            candidates: candidates.iter().map(|s| (*s).to_string()).collect(),
            version_flag: "-v".to_string(),
            parallel_jobs: 4,
        };
        ToolchainLocator::from_config(&config, None).unwrap()
    }

    #[test]
    fn empty_candidates_without_override_is_fatal() {
        let config = ToolchainConfig {
            candidates: Vec::new(),
            version_flag: "-v".to_string(),
            parallel_jobs: 4,
        };
        let err = ToolchainLocator::from_config(&config, None).unwrap_err();
        assert!(matches!(err, ShipflowError::Config(_)));
    }

    #[test]
    fn override_replaces_candidate_list() {
        let config = ToolchainConfig {
            candidates: Vec::new(),
            version_flag: "-v".to_string(),
            parallel_jobs: 4,
        };
        let locator = ToolchainLocator::from_config(&config, Some(474)).unwrap();
        assert_eq!(locator.candidates(), ["qmake474"]);
    }

    #[tokio::test]
    async fn probe_of_missing_binary_is_recoverable() {
        let locator = locator(&["qmake999-definitely-missing"]);
        let runner = ScriptedRunner::new();
        let err = locator
            .probe(&runner, "qmake999-definitely-missing", &std::env::temp_dir())
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn locate_all_skips_missing_candidates() {
        // "true" exists on PATH; the bogus candidate does not.
        let locator = locator(&["true", "qmake999-definitely-missing"]);
        let runner = ScriptedRunner::new()
            .with_stdout("true", ["Generator version 4.6.4", "Using runtime 4.6.4"]);

        let located = locator.locate_all(&runner, &std::env::temp_dir()).await;

        assert_eq!(located.len(), 1);
        assert_eq!(located[0].command, "true");
        assert_eq!(located[0].version.as_deref(), Some("Using runtime 4.6.4"));
    }
}
