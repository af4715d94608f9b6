//! Archive compression and relocation.

use super::STAGE_NAME;
use crate::core::BuildArtifact;
use crate::errors::ShipflowError;
use crate::utils::fs::move_file;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Compresses a staging directory into a gzip tar archive and moves it
/// to the release root.
///
/// The archive's single top-level entry is the staging directory itself,
/// so unpacking never spills files into the unpack location. On success
/// the staging directory is removed; on failure it is left in place so
/// the operator can inspect what would have been shipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveWriter;

impl ArchiveWriter {
    /// Creates an archive writer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Archives `staging_dir` as `archive_name` under `release_root`.
    pub fn write(
        &self,
        staging_dir: &Path,
        archive_name: &str,
        release_root: &Path,
    ) -> Result<BuildArtifact, ShipflowError> {
        let top_level = staging_dir
            .file_name()
            .ok_or_else(|| {
                ShipflowError::archive(archive_name, "staging directory has no name")
            })?
            .to_os_string();
        let work_archive = staging_dir
            .parent()
            .map_or_else(|| PathBuf::from(archive_name), |p| p.join(archive_name));

        self.compress(staging_dir, &top_level, &work_archive)
            .map_err(|e| ShipflowError::archive(archive_name, e.to_string()))?;

        let final_path = release_root.join(archive_name);
        move_file(&work_archive, &final_path)?;
        fs::remove_dir_all(staging_dir)?;

        info!(archive = %final_path.display(), "release archive written");
        Ok(BuildArtifact::new(final_path, STAGE_NAME))
    }

    fn compress(
        &self,
        staging_dir: &Path,
        top_level: &std::ffi::OsStr,
        archive_path: &Path,
    ) -> std::io::Result<()> {
        let file = fs::File::create(archive_path)?;
        let encoder = GzEncoder::new(file, Compression::best());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(top_level, staging_dir)?;
        builder.into_inner()?.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fs::extract_tar_gz;
    use pretty_assertions::assert_eq;

    fn staging_tree(root: &Path) -> PathBuf {
        let staging = root.join("staging/quickchart");
        fs::create_dir_all(staging.join("demos")).unwrap();
        fs::write(staging.join("quickchart.h"), "// header\n").unwrap();
        fs::write(staging.join("demos/main.cpp"), "int main() {}\n").unwrap();
        staging
    }

    #[test]
    fn archive_unpacks_to_single_top_level_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_tree(dir.path());
        let release_root = dir.path().join("release");
        fs::create_dir_all(&release_root).unwrap();

        let artifact = ArchiveWriter::new()
            .write(&staging, "QuickChart.tar.gz", &release_root)
            .unwrap();

        assert_eq!(artifact.path(), release_root.join("QuickChart.tar.gz"));

        let unpack = dir.path().join("unpack");
        extract_tar_gz(artifact.path(), &unpack).unwrap();
        let entries: Vec<_> = fs::read_dir(&unpack)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("quickchart")]);
        assert_eq!(
            fs::read_to_string(unpack.join("quickchart/quickchart.h")).unwrap(),
            "// header\n"
        );
    }

    #[test]
    fn staging_is_removed_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_tree(dir.path());
        let release_root = dir.path().join("release");
        fs::create_dir_all(&release_root).unwrap();

        ArchiveWriter::new()
            .write(&staging, "QuickChart.tar.gz", &release_root)
            .unwrap();

        assert!(!staging.exists());
        assert!(!staging.parent().unwrap().join("QuickChart.tar.gz").exists());
    }

    #[test]
    fn staging_is_left_behind_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_tree(dir.path());
        let missing_release_root = dir.path().join("does-not-exist");

        let err = ArchiveWriter::new()
            .write(&staging, "QuickChart.tar.gz", &missing_release_root)
            .unwrap_err();

        assert!(!err.is_recoverable());
        assert!(staging.exists());
    }
}
