//! Palette reduction of generated documentation images.

use crate::config::PaletteEntry;
use crate::errors::{ShipflowError, ShipflowWarning};
use crate::tools::{catalog, ToolInvocation, ToolRunner};
use crate::utils::fs::matches_pattern;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of one recompression pass.
#[derive(Debug, Default)]
pub struct ImageReport {
    /// Files handed to the palette reducer.
    pub recompressed: usize,
    /// Files covered by the table with a color count of 0.
    pub skipped: usize,
    /// Drift and best-effort failures observed during the pass.
    pub warnings: Vec<ShipflowWarning>,
}

/// Recompresses generated PNG images against a fixed expectation table.
///
/// The whole pass is best effort: a file the table does not cover and a
/// file the reducer chokes on both produce warnings, never errors. Only
/// an unreadable HTML directory is fatal.
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    palette_table: Vec<PaletteEntry>,
}

impl ImageCompressor {
    /// Creates a compressor with the given expectation table.
    #[must_use]
    pub fn new(palette_table: Vec<PaletteEntry>) -> Self {
        Self { palette_table }
    }

    fn lookup(&self, file_name: &str) -> Option<&PaletteEntry> {
        self.palette_table
            .iter()
            .find(|entry| matches_pattern(file_name, &entry.pattern))
    }

    /// Recompresses every PNG directly under `html_dir`.
    pub async fn compress(
        &self,
        runner: &dyn ToolRunner,
        html_dir: &Path,
    ) -> Result<ImageReport, ShipflowError> {
        let mut report = ImageReport::default();

        let mut images: Vec<_> = fs::read_dir(html_dir)?
            .filter_map(Result::ok)
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .map(|e| e.path())
            .collect();
        images.sort();

        for image in images {
            let Some(name) = image.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(entry) = self.lookup(name) else {
                // Generator output drifted from the expectation table.
                // Left untouched so nothing degrades silently.
                warn!(file = %image.display(), "image not covered by palette table");
                report
                    .warnings
                    .push(ShipflowWarning::ConfigurationDrift { path: image });
                continue;
            };

            if entry.colors == 0 {
                report.skipped += 1;
                continue;
            }

            debug!(file = %image.display(), colors = entry.colors, "recompressing");
            let invocation = ToolInvocation::new(
                catalog::palette_reducer(entry.colors, &image),
                html_dir,
            );
            match runner.run(&invocation).await {
                Ok(output) if output.success() => report.recompressed += 1,
                Ok(output) => {
                    warn!(file = %image.display(), exit = %output.describe_exit(), "palette reduction failed");
                    report.warnings.push(ShipflowWarning::BestEffortFailure {
                        path: image,
                        detail: output.describe_exit(),
                    });
                }
                Err(err) => {
                    warn!(file = %image.display(), error = %err, "palette reducer unavailable");
                    report.warnings.push(ShipflowWarning::BestEffortFailure {
                        path: image,
                        detail: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_palette_table;
    use crate::testing::ScriptedRunner;
    use pretty_assertions::assert_eq;

    fn html_dir_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"\x89PNG").unwrap();
        }
        dir
    }

    #[test]
    fn first_matching_entry_wins() {
        let compressor = ImageCompressor::new(vec![
            PaletteEntry::new("tab_*.png", 16),
            PaletteEntry::new("tab_b.png", 64),
        ]);
        let entry = compressor.lookup("tab_b.png").unwrap();
        assert_eq!(entry.colors, 16);
    }

    #[tokio::test]
    async fn covered_images_are_recompressed() {
        let dir = html_dir_with(&["ftv2node.png", "tab_b.png", "index.html"]);
        let compressor = ImageCompressor::new(default_palette_table());
        let runner = ScriptedRunner::new();

        let report = compressor.compress(&runner, dir.path()).await.unwrap();

        assert_eq!(report.recompressed, 2);
        assert!(report.warnings.is_empty());
        // One reducer call per image, none for the HTML file.
        assert_eq!(runner.invocations().len(), 2);
    }

    #[tokio::test]
    async fn zero_color_entries_are_skipped() {
        let dir = html_dir_with(&["doxygen.png"]);
        let compressor =
            ImageCompressor::new(vec![PaletteEntry::new("doxygen.png", 0)]);
        let runner = ScriptedRunner::new();

        let report = compressor.compress(&runner, dir.path()).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.recompressed, 0);
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn uncovered_image_warns_and_is_untouched() {
        let dir = html_dir_with(&["surprise.png"]);
        let compressor = ImageCompressor::new(default_palette_table());
        let runner = ScriptedRunner::new();

        let report = compressor.compress(&runner, dir.path()).await.unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            ShipflowWarning::ConfigurationDrift { .. }
        ));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn reducer_failure_is_best_effort() {
        let dir = html_dir_with(&["tab_b.png", "tab_a.png"]);
        let compressor = ImageCompressor::new(default_palette_table());
        let runner = ScriptedRunner::new().with_exit("mogrify", 1);

        let report = compressor.compress(&runner, dir.path()).await.unwrap();

        // Both files were attempted despite the failures.
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .all(|w| matches!(w, ShipflowWarning::BestEffortFailure { .. })));
    }
}
