//! Execution context threaded through pipeline stages.

use crate::config::ReleaseConfig;
use crate::events::{EventSink, NoOpEventSink};
use crate::tools::{ProcessRunner, ToolRunner};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunIdentity {
    /// Unique run id.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// Creates a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to every stage.
///
/// The working directory is an explicit value here, never ambient
/// process state: a stage that needs a different directory derives a
/// child context with [`StageContext::in_dir`] instead of calling
/// `chdir`.
#[derive(Clone)]
pub struct StageContext {
    /// Run identity.
    pub identity: RunIdentity,
    /// Repository root; release archives land here.
    pub base_dir: PathBuf,
    /// Directory the current stage operates in.
    pub work_dir: PathBuf,
    /// The run configuration.
    pub config: Arc<ReleaseConfig>,
    /// The tool execution seam.
    pub runner: Arc<dyn ToolRunner>,
    /// Event sink for observability.
    pub events: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a context rooted at `base_dir` with the default process
    /// runner and no event sink.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, config: Arc<ReleaseConfig>) -> Self {
        let base_dir = base_dir.into();
        Self {
            identity: RunIdentity::new(),
            work_dir: base_dir.clone(),
            base_dir,
            config,
            runner: Arc::new(ProcessRunner::new()),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the tool runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Derives a context whose working directory is `dir` (absolute) or
    /// `base_dir/dir` (relative). The base directory is unchanged.
    #[must_use]
    pub fn in_dir(&self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let work_dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        };
        Self {
            work_dir,
            ..self.clone()
        }
    }

    /// Resolves a path relative to the base directory.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Emits an event without blocking.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.try_emit(event_type, data);
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.identity.run_id)
            .field("base_dir", &self.base_dir)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;

    fn context() -> StageContext {
        StageContext::new(
            "/srv/release",
            Arc::new(ReleaseConfig::for_product("QuickChart")),
        )
    }

    #[test]
    fn in_dir_keeps_base() {
        let ctx = context();
        let child = ctx.in_dir("documentation/html");
        assert_eq!(child.base_dir, PathBuf::from("/srv/release"));
        assert_eq!(
            child.work_dir,
            PathBuf::from("/srv/release/documentation/html")
        );
        // The parent context is untouched.
        assert_eq!(ctx.work_dir, PathBuf::from("/srv/release"));
    }

    #[test]
    fn resolve_handles_absolute_paths() {
        let ctx = context();
        assert_eq!(ctx.resolve("GPL.txt"), PathBuf::from("/srv/release/GPL.txt"));
        assert_eq!(ctx.resolve("/etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn events_flow_to_sink() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = context().with_events(sink.clone());
        ctx.try_emit_event("stage.started", Some(serde_json::json!({"stage": "clean"})));
        assert_eq!(sink.len(), 1);
    }
}
