//! Colorized operator-facing diagnostics.
//!
//! The release scripts this pipeline replaces printed progress in bold
//! cyan and failures in bold red; operators grep for those colors in
//! terminal scrollback, so the convention is kept.

use async_trait::async_trait;
use colored::Colorize;

use super::EventSink;

/// Prints pipeline progress and failures to the console.
///
/// Also usable as an [`EventSink`], translating stage events into the
/// same colorized lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Creates a reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Prints an informational message in bold cyan.
    pub fn info(&self, message: &str) {
        println!("{}", message.cyan().bold());
    }

    /// Prints an error message in bold red.
    pub fn error(&self, message: &str) {
        eprintln!("{}", message.red().bold());
    }

    /// Prints a warning message in bold yellow.
    pub fn warn(&self, message: &str) {
        eprintln!("{}", message.yellow().bold());
    }

    fn describe(event_type: &str, data: &Option<serde_json::Value>) -> Option<String> {
        let field = |key: &str| {
            data.as_ref()
                .and_then(|d| d.get(key))
                .and_then(serde_json::Value::as_str)
                .map(std::string::ToString::to_string)
        };
        match event_type {
            "stage.started" => field("stage").map(|s| format!("{s}...")),
            "stage.failed" => {
                let stage = field("stage").unwrap_or_else(|| "unknown stage".to_string());
                let error = field("error").unwrap_or_else(|| "unknown error".to_string());
                Some(format!("{stage} failed: {error}"))
            }
            "toolchain.skipped" => field("command")
                .map(|c| format!("Toolchain '{c}' not found, skipping.")),
            _ => None,
        }
    }
}

#[async_trait]
impl EventSink for ConsoleReporter {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        if let Some(line) = Self::describe(event_type, &data) {
            if event_type == "stage.failed" {
                self.error(&line);
            } else {
                self.info(&line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_stage_events() {
        let started = ConsoleReporter::describe(
            "stage.started",
            &Some(serde_json::json!({"stage": "amalgamate"})),
        );
        assert_eq!(started.as_deref(), Some("amalgamate..."));

        let failed = ConsoleReporter::describe(
            "stage.failed",
            &Some(serde_json::json!({"stage": "package", "error": "tar failed"})),
        );
        assert_eq!(failed.as_deref(), Some("package failed: tar failed"));
    }

    #[test]
    fn ignores_unknown_events() {
        assert!(ConsoleReporter::describe("pipeline.finished", &None).is_none());
    }
}
