//! Filesystem helpers used by packaging and documentation stages.

use crate::errors::ShipflowError;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copies a directory tree.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), ShipflowError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            ShipflowError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walk error")
            }))
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "path outside root"))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Removes every file named `file_name` under `root`, recursively.
/// Returns the number of files removed.
pub fn strip_matching_files(root: &Path, file_name: &str) -> Result<usize, ShipflowError> {
    let mut removed = 0;
    let matches: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == file_name)
        .map(|e| e.path().to_path_buf())
        .collect();
    for path in matches {
        fs::remove_file(&path)?;
        removed += 1;
    }
    Ok(removed)
}

/// Moves a file, falling back to copy-and-delete across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<(), ShipflowError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

/// Extracts a gzip-compressed tar archive into a directory.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), ShipflowError> {
    let file = fs::File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest)?;
    Ok(())
}

/// Matches a file name against a pattern with at most one `*` wildcard.
#[must_use]
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        None => name == pattern,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_preserves_tree() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/file.txt"), "hello").unwrap();
        fs::write(src.path().join("top.txt"), "top").unwrap();

        copy_dir_recursive(src.path(), &dst.path().join("copy")).unwrap();

        assert_eq!(
            fs::read_to_string(dst.path().join("copy/a/b/file.txt")).unwrap(),
            "hello"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("copy/top.txt")).unwrap(),
            "top"
        );
    }

    #[test]
    fn strips_ignore_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join(".gitignore"), "*").unwrap();
        fs::write(dir.path().join("nested/.gitignore"), "*").unwrap();
        fs::write(dir.path().join("nested/kept.txt"), "x").unwrap();

        let removed = strip_matching_files(dir.path(), ".gitignore").unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.path().join(".gitignore").exists());
        assert!(dir.path().join("nested/kept.txt").exists());
    }

    #[test]
    fn pattern_matching() {
        assert!(matches_pattern("doxygen.png", "doxygen.png"));
        assert!(matches_pattern("ftv2node.png", "ftv2*.png"));
        assert!(matches_pattern("classFoo__inherit__graph.png", "class*__inherit__graph.png"));
        assert!(!matches_pattern("tab_b.png", "ftv2*.png"));
        assert!(!matches_pattern("x.png", "xlong*.png"));
    }

    #[test]
    fn move_file_replaces_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.tar.gz");
        let to = dir.path().join("b.tar.gz");
        fs::write(&from, "archive").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "archive");
    }
}
