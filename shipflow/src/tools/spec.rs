//! Tool specifications and invocation results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Description of one external tool call.
///
/// The contract is deliberately narrow: a program, its arguments, and
/// "exit code zero means success". Tools with a stdout-line contract
/// (the version probe) expose it through [`ToolOutput::stdout_lines`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Logical tool name used in diagnostics.
    pub name: String,
    /// Program to invoke.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl ToolSpec {
    /// Creates a new tool specification.
    #[must_use]
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// A tool call bound to a working directory.
///
/// The working directory is an explicit value; the runner never mutates
/// the process-wide current directory.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// What to run.
    pub spec: ToolSpec,
    /// Where to run it.
    pub cwd: PathBuf,
    /// Extra environment variables for the child process.
    pub envs: Vec<(String, String)>,
    /// Whether stdout should be captured line by line.
    pub capture_stdout: bool,
}

impl ToolInvocation {
    /// Creates an invocation in the given working directory.
    #[must_use]
    pub fn new(spec: ToolSpec, cwd: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            cwd: cwd.into(),
            envs: Vec::new(),
            capture_stdout: false,
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Requests stdout capture.
    #[must_use]
    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, if the process exited on its own.
    pub exit_code: Option<i32>,
    /// Captured stdout lines, if capture was requested.
    pub stdout_lines: Vec<String>,
    /// True if the process outlived its grace period and was killed.
    /// Only set by grace-limited runs of interactive executables.
    pub killed_after_grace: bool,
}

impl ToolOutput {
    /// Creates an output for a cleanly exited process.
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            stdout_lines: Vec::new(),
            killed_after_grace: false,
        }
    }

    /// Creates an output for a process killed after its grace period.
    #[must_use]
    pub fn killed() -> Self {
        Self {
            exit_code: None,
            stdout_lines: Vec::new(),
            killed_after_grace: true,
        }
    }

    /// Attaches captured stdout lines.
    #[must_use]
    pub fn with_stdout<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdout_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the invocation fulfilled its contract.
    ///
    /// A process killed after its grace period counts as success: for
    /// GUI test executables, surviving the grace period is the pass
    /// condition.
    #[must_use]
    pub fn success(&self) -> bool {
        self.killed_after_grace || self.exit_code == Some(0)
    }

    /// Describes the exit for diagnostics.
    #[must_use]
    pub fn describe_exit(&self) -> String {
        match (self.exit_code, self.killed_after_grace) {
            (_, true) => "killed after grace period".to_string(),
            (Some(code), _) => format!("exit code {code}"),
            (None, _) => "terminated by signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder_orders_args() {
        let spec = ToolSpec::new("palette-reducer", "mogrify")
            .args(["-colorspace", "RGB"])
            .arg("-colors")
            .arg("64");
        assert_eq!(spec.args, vec!["-colorspace", "RGB", "-colors", "64"]);
    }

    #[test]
    fn zero_exit_is_success() {
        assert!(ToolOutput::exited(0).success());
        assert!(!ToolOutput::exited(2).success());
    }

    #[test]
    fn killed_after_grace_is_success() {
        let output = ToolOutput::killed();
        assert!(output.success());
        assert_eq!(output.describe_exit(), "killed after grace period");
    }

    #[test]
    fn invocation_env_and_capture() {
        let inv = ToolInvocation::new(ToolSpec::new("usage", "./usage"), "/tmp")
            .env("LD_LIBRARY_PATH", ".")
            .capture_stdout();
        assert_eq!(inv.envs.len(), 1);
        assert!(inv.capture_stdout);
    }
}
