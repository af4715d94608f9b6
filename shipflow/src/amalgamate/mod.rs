//! Source amalgamation.
//!
//! The distributable form of the library is two files: an interface
//! declaration file and an implementation file, each merged from an
//! ordered list of source fragments. The order is a build-time
//! configuration constant; the merge is a deterministic byte
//! concatenation, so re-running on unchanged fragments produces
//! byte-identical output.

use crate::config::AmalgamationConfig;
use crate::core::BuildArtifact;
use crate::errors::ShipflowError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name used in missing-artifact diagnostics.
pub const STAGE_NAME: &str = "amalgamate";

/// Merges source fragments into the two distributable files.
#[derive(Debug, Clone)]
pub struct SourceAmalgamator {
    config: AmalgamationConfig,
}

impl SourceAmalgamator {
    /// Creates an amalgamator.
    #[must_use]
    pub fn new(config: AmalgamationConfig) -> Self {
        Self { config }
    }

    /// Merges both fragment sets, rooted at `base_dir`.
    ///
    /// Fails fatally if any declared fragment is missing; nothing is
    /// written in that case.
    pub fn amalgamate(&self, base_dir: &Path) -> Result<Vec<BuildArtifact>, ShipflowError> {
        // Verify the complete fragment set before writing anything, so
        // a missing fragment can never leave one of the two outputs
        // stale relative to the other.
        for fragment in self
            .config
            .interface_fragments
            .iter()
            .chain(&self.config.implementation_fragments)
        {
            let path = base_dir.join(fragment);
            if !path.is_file() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, path));
            }
        }

        let interface = self.merge(
            base_dir,
            &self.config.interface_fragments,
            &self.config.interface_output,
        )?;
        let implementation = self.merge(
            base_dir,
            &self.config.implementation_fragments,
            &self.config.implementation_output,
        )?;
        Ok(vec![interface, implementation])
    }

    fn merge(
        &self,
        base_dir: &Path,
        fragments: &[PathBuf],
        output: &Path,
    ) -> Result<BuildArtifact, ShipflowError> {
        let mut merged: Vec<u8> = Vec::new();
        for fragment in fragments {
            let bytes = fs::read(base_dir.join(fragment))?;
            merged.extend_from_slice(&bytes);
        }

        let output_path = base_dir.join(output);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, &merged)?;
        debug!(
            output = %output_path.display(),
            fragments = fragments.len(),
            bytes = merged.len(),
            "amalgamated"
        );
        Ok(BuildArtifact::new(output_path, STAGE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_for(dir: &Path) -> AmalgamationConfig {
        fs::write(dir.join("part1.h"), "// part one\n").unwrap();
        fs::write(dir.join("part2.h"), "// part two\n").unwrap();
        fs::write(dir.join("part1.cpp"), "impl one\n").unwrap();
        fs::write(dir.join("part2.cpp"), "impl two\n").unwrap();
        AmalgamationConfig {
            interface_fragments: vec!["part1.h".into(), "part2.h".into()],
            implementation_fragments: vec!["part1.cpp".into(), "part2.cpp".into()],
            interface_output: "widget.h".into(),
            implementation_output: "widget.cpp".into(),
        }
    }

    #[test]
    fn merges_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        let amalgamator = SourceAmalgamator::new(config_for(dir.path()));

        let artifacts = amalgamator.amalgamate(dir.path()).unwrap();

        assert_eq!(artifacts.len(), 2);
        let header = fs::read_to_string(dir.path().join("widget.h")).unwrap();
        assert_eq!(header, "// part one\n// part two\n");
        let implementation = fs::read_to_string(dir.path().join("widget.cpp")).unwrap();
        assert_eq!(implementation, "impl one\nimpl two\n");
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let amalgamator = SourceAmalgamator::new(config_for(dir.path()));

        amalgamator.amalgamate(dir.path()).unwrap();
        let first = fs::read(dir.path().join("widget.h")).unwrap();
        amalgamator.amalgamate(dir.path()).unwrap();
        let second = fs::read(dir.path().join("widget.h")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn missing_fragment_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.implementation_fragments.push("part3.cpp".into());
        let amalgamator = SourceAmalgamator::new(config);

        let err = amalgamator.amalgamate(dir.path()).unwrap_err();

        assert!(matches!(err, ShipflowError::MissingArtifact { .. }));
        assert!(!dir.path().join("widget.h").exists());
        assert!(!dir.path().join("widget.cpp").exists());
    }
}
