//! Staging-directory assembly.

use super::STAGE_NAME;
use crate::config::VariantConfig;
use crate::errors::ShipflowError;
use crate::utils::fs::{copy_dir_recursive, strip_matching_files};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name stripped from every staging tree before archiving.
const IGNORE_FILE: &str = ".gitignore";

/// Builds a variant's staging directory from its copy mappings.
///
/// All declared sources are verified before any filesystem mutation, so
/// a misdeclared variant fails without leaving a half-built staging
/// tree behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageAssembler;

impl PackageAssembler {
    /// Creates an assembler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assembles `variant` under `staging_root`, copying sources from
    /// `base_dir`. Returns the staging directory path.
    pub fn assemble(
        &self,
        base_dir: &Path,
        staging_root: &Path,
        variant: &VariantConfig,
    ) -> Result<PathBuf, ShipflowError> {
        for mapping in &variant.sources {
            let source = base_dir.join(&mapping.from);
            if !source.exists() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, source));
            }
        }

        let staging = staging_root.join(&variant.staging_name);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        for mapping in &variant.sources {
            let source = base_dir.join(&mapping.from);
            let dest = Self::destination(&staging, &mapping.from, &mapping.to, source.is_dir());
            debug!(from = %source.display(), to = %dest.display(), "staging");
            if source.is_dir() {
                copy_dir_recursive(&source, &dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&source, &dest)?;
            }
        }

        for prune in &variant.prune {
            let target = staging.join(prune);
            if target.is_dir() {
                fs::remove_dir_all(&target)?;
            } else if target.is_file() {
                fs::remove_file(&target)?;
            }
        }

        let stripped = strip_matching_files(&staging, IGNORE_FILE)?;
        info!(
            variant = %variant.kind,
            staging = %staging.display(),
            ignore_files_stripped = stripped,
            "staging directory assembled"
        );
        Ok(staging)
    }

    fn destination(staging: &Path, from: &Path, to: &Path, is_dir: bool) -> PathBuf {
        if to == Path::new(".") {
            if is_dir {
                // Directory contents land directly in the staging root.
                staging.to_path_buf()
            } else {
                from.file_name()
                    .map_or_else(|| staging.to_path_buf(), |name| staging.join(name))
            }
        } else {
            staging.join(to)
        }
    }
}
