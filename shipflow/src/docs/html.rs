//! Generated-HTML rewriting.

use crate::config::RewriteRule;
use crate::errors::ShipflowError;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Name used in missing-artifact diagnostics.
pub const STAGE_NAME: &str = "doc-html-rewrite";

/// Applies an ordered list of pattern substitutions to a fixed set of
/// generated HTML files.
///
/// A missing target file is fatal: it signals the external generator
/// did not run as expected.
#[derive(Debug)]
pub struct HtmlRewriter {
    rules: Vec<(Regex, String)>,
}

impl HtmlRewriter {
    /// Compiles the rewrite rules, preserving their listed order.
    pub fn new(rules: &[RewriteRule]) -> Result<Self, ShipflowError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                ShipflowError::Config(format!("invalid rewrite pattern '{}': {e}", rule.pattern))
            })?;
            compiled.push((regex, rule.replacement.clone()));
        }
        Ok(Self { rules: compiled })
    }

    /// Rewrites every named file under `html_dir`.
    pub fn rewrite_files(&self, html_dir: &Path, files: &[String]) -> Result<(), ShipflowError> {
        for name in files {
            let path = html_dir.join(name);
            if !path.is_file() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, path));
            }
            self.rewrite_file(&path)?;
        }
        Ok(())
    }

    /// Rewrites one file in place: every rule is applied in listed
    /// order against every line, and the result atomically replaces the
    /// original (write to temp, delete original, rename temp). Line
    /// terminators are preserved verbatim, so a file no rule matches is
    /// byte-identical afterwards.
    pub fn rewrite_file(&self, path: &Path) -> Result<(), ShipflowError> {
        debug!(file = %path.display(), "html postprocessing");

        let content = fs::read_to_string(path)?;
        let mut rewritten = String::with_capacity(content.len());
        for segment in content.split_inclusive('\n') {
            let (line, terminator) = split_line_terminator(segment);
            let mut line = line.to_string();
            for (regex, replacement) in &self.rules {
                line = regex.replace_all(&line, replacement.as_str()).into_owned();
            }
            rewritten.push_str(&line);
            rewritten.push_str(terminator);
        }

        let temp_path = path.with_extension("html.tmp");
        fs::write(&temp_path, rewritten)?;
        fs::remove_file(path)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

fn split_line_terminator(segment: &str) -> (&str, &str) {
    if let Some(line) = segment.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = segment.strip_suffix('\n') {
        (line, "\n")
    } else {
        (segment, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewriter() -> HtmlRewriter {
        HtmlRewriter::new(&[
            RewriteRule::new(
                "<div class=\"title\">Related Pages</div>",
                "<div class=\"title\">Special Pages</div>",
            ),
            RewriteRule::new("This list is sorted alphabetically:", ""),
        ])
        .unwrap()
    }

    #[test]
    fn applies_rules_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pages.html");
        fs::write(
            &file,
            "<div class=\"title\">Related Pages</div>\nThis list is sorted alphabetically:\nuntouched\n",
        )
        .unwrap();

        rewriter().rewrite_files(dir.path(), &["pages.html".to_string()]).unwrap();

        let rewritten = fs::read_to_string(&file).unwrap();
        assert_eq!(
            rewritten,
            "<div class=\"title\">Special Pages</div>\n\nuntouched\n"
        );
    }

    #[test]
    fn second_pass_is_identity_for_non_self_matching_rules() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pages.html");
        fs::write(&file, "<div class=\"title\">Related Pages</div>\n").unwrap();
        let rewriter = rewriter();
        let files = vec!["pages.html".to_string()];

        rewriter.rewrite_files(dir.path(), &files).unwrap();
        let once = fs::read(&file).unwrap();
        rewriter.rewrite_files(dir.path(), &files).unwrap();
        let twice = fs::read(&file).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_line_terminators_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pages.html");
        // CRLF endings and no terminator on the last line.
        fs::write(&file, "first line\r\nno match here").unwrap();

        rewriter().rewrite_files(dir.path(), &["pages.html".to_string()]).unwrap();

        assert_eq!(fs::read(&file).unwrap(), b"first line\r\nno match here");
    }

    #[test]
    fn missing_target_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = rewriter()
            .rewrite_files(dir.path(), &["absent.html".to_string()])
            .unwrap_err();
        assert!(matches!(err, ShipflowError::MissingArtifact { .. }));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pages.html");
        fs::write(&file, "content\n").unwrap();

        rewriter().rewrite_files(dir.path(), &["pages.html".to_string()]).unwrap();

        assert!(!dir.path().join("pages.html.tmp").exists());
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = HtmlRewriter::new(&[RewriteRule::new("(", "")]).unwrap_err();
        assert!(matches!(err, ShipflowError::Config(_)));
    }
}
