//! Tool execution.

use super::{ToolInvocation, ToolOutput};
use crate::errors::ShipflowError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Executes tool invocations.
///
/// The pipeline is written against this trait so tests can script tool
/// behavior without spawning processes.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs a tool to completion.
    ///
    /// Returns `Err` only when the process could not be spawned; an
    /// unsuccessful exit is reported through [`ToolOutput`].
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ShipflowError>;

    /// Runs a tool, killing it if it outlives the grace period.
    ///
    /// Used for GUI test executables: staying alive past the grace
    /// period is the pass condition, so a kill reports success.
    async fn run_with_grace(
        &self,
        invocation: &ToolInvocation,
        _grace: Duration,
    ) -> Result<ToolOutput, ShipflowError> {
        self.run(invocation).await
    }
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &ToolInvocation) -> Command {
        let mut cmd = Command::new(&invocation.spec.program);
        cmd.args(&invocation.spec.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null());
        for (key, value) in &invocation.envs {
            cmd.env(key, value);
        }
        if invocation.capture_stdout {
            cmd.stdout(Stdio::piped());
        }
        cmd
    }

    fn spawn_error(invocation: &ToolInvocation, err: &std::io::Error) -> ShipflowError {
        ShipflowError::tool_failure(
            invocation.spec.name.clone(),
            format!("failed to spawn '{}': {err}", invocation.spec.program),
        )
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ShipflowError> {
        debug!(
            tool = %invocation.spec.name,
            program = %invocation.spec.program,
            cwd = %invocation.cwd.display(),
            "running tool"
        );

        let output = Self::command(invocation)
            .output()
            .await
            .map_err(|e| Self::spawn_error(invocation, &e))?;

        let mut result = ToolOutput {
            exit_code: output.status.code(),
            stdout_lines: Vec::new(),
            killed_after_grace: false,
        };
        if invocation.capture_stdout {
            result.stdout_lines = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(std::string::ToString::to_string)
                .collect();
        }
        Ok(result)
    }

    async fn run_with_grace(
        &self,
        invocation: &ToolInvocation,
        grace: Duration,
    ) -> Result<ToolOutput, ShipflowError> {
        debug!(
            tool = %invocation.spec.name,
            grace_ms = grace.as_millis() as u64,
            "running tool with grace period"
        );

        let mut child = Self::command(invocation)
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, &e))?;

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(|e| Self::spawn_error(invocation, &e))?;
                Ok(ToolOutput {
                    exit_code: status.code(),
                    stdout_lines: Vec::new(),
                    killed_after_grace: false,
                })
            }
            Err(_) => {
                // Still running after the grace period: the executable
                // came up successfully. Kill it and report success.
                let _ = child.kill().await;
                Ok(ToolOutput::killed())
            }
        }
    }
}
