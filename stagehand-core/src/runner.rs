//! Subprocess execution of resolved task specs.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::spec::TaskSpec;

/// Explicit per-task outcome. Failures are values collected into results,
/// never errors that abort sibling tasks.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Label of the spec that produced this outcome.
    pub name: String,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TaskOutcome {
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            stdout: String::new(),
            stderr: message.into(),
        }
    }
}

/// Executes resolved task specs. `run` awaits a single subprocess to
/// completion; `batch` runs a group concurrently with no ordering
/// guarantee among members. Neither enforces a per-task timeout.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &TaskSpec) -> TaskOutcome;

    async fn batch(&self, specs: &[TaskSpec]) -> Vec<TaskOutcome>;
}

/// Runner backed by OS subprocesses via tokio.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    root: PathBuf,
}

impl SubprocessRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, spec: &TaskSpec) -> TaskOutcome {
        if spec.cmd.is_empty() {
            return TaskOutcome::failure(&spec.name, "empty command");
        }

        tracing::debug!("running {} ({} {:?})", spec.name, spec.cmd, spec.args);
        let output = Command::new(&spec.cmd)
            .args(&spec.args)
            .current_dir(self.root.join(&spec.cwd))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => TaskOutcome {
                name: spec.name.clone(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => TaskOutcome::failure(&spec.name, format!("failed to spawn: {}", e)),
        }
    }

    async fn batch(&self, specs: &[TaskSpec]) -> Vec<TaskOutcome> {
        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let runner = self.clone();
            let spec = spec.clone();
            handles.push((
                spec.name.clone(),
                tokio::spawn(async move { runner.run(&spec).await }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(TaskOutcome::failure(name, format!("task panicked: {}", e))),
            }
        }
        outcomes
    }
}
