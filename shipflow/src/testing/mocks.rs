//! Scripted tool runner.

use crate::errors::ShipflowError;
use crate::tools::{ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

enum Behavior {
    Stdout(Vec<String>),
    Exit(i32),
    SpawnError(String),
}

/// A [`ToolRunner`] that replays scripted behavior per program name and
/// records every invocation.
///
/// Programs without a script succeed with exit code 0 and no output.
#[derive(Default)]
pub struct ScriptedRunner {
    behaviors: HashMap<String, Behavior>,
    grace_survivors: HashSet<String>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    /// Creates a runner where every program succeeds silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a program to succeed and print the given stdout lines.
    #[must_use]
    pub fn with_stdout<I, S>(mut self, program: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.behaviors.insert(
            program.into(),
            Behavior::Stdout(lines.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Scripts a program to exit with the given code.
    #[must_use]
    pub fn with_exit(mut self, program: impl Into<String>, code: i32) -> Self {
        self.behaviors.insert(program.into(), Behavior::Exit(code));
        self
    }

    /// Scripts a program to fail to spawn.
    #[must_use]
    pub fn with_spawn_error(
        mut self,
        program: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        self.behaviors
            .insert(program.into(), Behavior::SpawnError(detail.into()));
        self
    }

    /// Scripts a program to outlive its grace period when run with one.
    #[must_use]
    pub fn with_grace_survivor(mut self, program: impl Into<String>) -> Self {
        self.grace_survivors.insert(program.into());
        self
    }

    /// Returns every invocation recorded so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().clone()
    }

    fn respond(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ShipflowError> {
        self.invocations.lock().push(invocation.clone());
        match self.behaviors.get(&invocation.spec.program) {
            None => Ok(ToolOutput::exited(0)),
            Some(Behavior::Stdout(lines)) => {
                Ok(ToolOutput::exited(0).with_stdout(lines.clone()))
            }
            Some(Behavior::Exit(code)) => Ok(ToolOutput::exited(*code)),
            Some(Behavior::SpawnError(detail)) => Err(ShipflowError::tool_failure(
                invocation.spec.name.clone(),
                detail.clone(),
            )),
        }
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ShipflowError> {
        self.respond(invocation)
    }

    async fn run_with_grace(
        &self,
        invocation: &ToolInvocation,
        _grace: Duration,
    ) -> Result<ToolOutput, ShipflowError> {
        if self.grace_survivors.contains(&invocation.spec.program) {
            self.invocations.lock().push(invocation.clone());
            return Ok(ToolOutput::killed());
        }
        self.respond(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSpec;

    fn invocation(program: &str) -> ToolInvocation {
        ToolInvocation::new(ToolSpec::new(program, program), "/tmp")
    }

    #[tokio::test]
    async fn unscripted_programs_succeed() {
        let runner = ScriptedRunner::new();
        let output = runner.run(&invocation("make")).await.unwrap();
        assert!(output.success());
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn scripted_exit_code_is_replayed() {
        let runner = ScriptedRunner::new().with_exit("make", 2);
        let output = runner.run(&invocation("make")).await.unwrap();
        assert_eq!(output.exit_code, Some(2));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn grace_survivor_reports_kill() {
        let runner = ScriptedRunner::new().with_grace_survivor("./plots");
        let output = runner
            .run_with_grace(&invocation("./plots"), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(output.killed_after_grace);
        assert!(output.success());
    }
}
