//! Utilities for running commands with proper error handling and timeouts

use crate::error::CycleError;
use anyhow::{Context, Result};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured streams of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A command that printed nothing on stderr
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(stdout, String::new())
    }

    /// A command that printed `stderr`
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self::new(String::new(), stderr)
    }

    pub fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Any stderr output at all means the command failed
    pub fn is_failure(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// Turn stderr output into a [`CycleError::RemoteCommand`].
    ///
    /// `describe` receives the stderr text and builds the full message, so
    /// callers decide which target (directory, hook, archive) gets named.
    pub fn check<F>(self, describe: F) -> Result<Self, CycleError>
    where
        F: FnOnce(&str) -> String,
    {
        if self.is_failure() {
            Err(CycleError::RemoteCommand(describe(self.stderr.trim_end())))
        } else {
            Ok(self)
        }
    }
}

/// Run a prepared command to completion, capturing both streams.
///
/// The child is killed if it outlives `timeout`. A non-zero exit status is not
/// an error here; callers look at the captured output.
pub async fn run_command(mut cmd: Command, label: &str, timeout: Duration) -> Result<Output> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("Running command: {}", label);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| anyhow::anyhow!("{} timed out after {:?}", label, timeout))?
        .with_context(|| format!("Failed to execute {}", label))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout.trim_end());
    }

    Ok(output)
}
