//! External command execution
//!
//! Every call to the VM manager or the container engine goes through a
//! [`CommandRunner`]. A non-zero exit is an ordinary [`CommandOutput`];
//! only a failure to spawn the binary is an error.

use crate::error::{DocksideError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of one finished (or timed out) command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed or timed out
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn timeout(program: &str, after: Duration) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: format!("`{}` timed out after {}s", program, after.as_secs_f32()),
            timed_out: true,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a failed run into [`DocksideError::NonZeroExit`]
    pub fn into_result(self, program: &str) -> Result<CommandOutput> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(DocksideError::NonZeroExit {
                program: program.to_string(),
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        tracing::debug!("Running: {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a timed out child is dropped together with the wait future below
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DocksideError::Execution {
                program: program.to_string(),
                source,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    timed_out: false,
                };
                if !result.succeeded() {
                    tracing::debug!(
                        "{} exited with {:?}: {}",
                        program,
                        result.exit_code,
                        result.stderr.trim()
                    );
                }
                Ok(result)
            }
            Ok(Err(source)) => Err(DocksideError::Execution {
                program: program.to_string(),
                source,
            }),
            Err(_) => {
                tracing::warn!("{} timed out after {:?}, killed", program, timeout);
                Ok(CommandOutput::timeout(program, timeout))
            }
        }
    }
}

/// Argument list builder for CLI invocations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    args: Vec<String>,
}

impl Args {
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: initial.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag value` when a value is present
    pub fn opt<T: ToString>(mut self, flag: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.args.push(flag.to_string());
            self.args.push(v.to_string());
        }
        self
    }

    /// Append `flag` when `condition` holds
    pub fn flag(mut self, flag: &str, condition: bool) -> Self {
        if condition {
            self.args.push(flag.to_string());
        }
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}
