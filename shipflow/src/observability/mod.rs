//! Structured tracing helpers for pipeline runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Span attributes recorded for one stage execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage_name: String,
    /// Stage status.
    pub status: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Creates new stage span attributes.
    #[must_use]
    pub fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            ..Default::default()
        }
    }

    /// Sets the stage status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Converts to flat key/value attributes.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("stage.name".to_string(), self.stage_name.clone());
        if let Some(ref v) = self.status {
            attrs.insert("stage.status".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("stage.error".to_string(), v.clone());
        }
        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_span_attributes() {
        let attrs = StageSpanAttributes::new("package")
            .with_status("fail")
            .with_duration_ms(12.5)
            .with_error("tar failed");

        let flat = attrs.to_attributes();
        assert_eq!(flat.get("stage.name"), Some(&"package".to_string()));
        assert_eq!(flat.get("stage.status"), Some(&"fail".to_string()));
        assert_eq!(flat.get("stage.duration_ms"), Some(&"12.5".to_string()));
    }

    #[test]
    fn span_timer_measures() {
        let timer = SpanTimer::start("clean");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(timer.name(), "clean");
        assert!(timer.finish() >= 5.0);
    }
}
