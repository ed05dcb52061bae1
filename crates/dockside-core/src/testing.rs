//! Scripted [`CommandRunner`] for tests

use crate::error::{DocksideError, Result};
use crate::exec::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    SpawnError,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    reply: Reply,
    delay: Duration,
}

/// Answers commands from a script and records every invocation.
///
/// A command line is `program arg1 arg2 ...`. The most recently added rule
/// whose pattern occurs in the command line wins; unmatched commands fail
/// with exit code 127.
#[derive(Debug, Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.push(pattern, Reply::Output(output), Duration::ZERO)
    }

    pub fn on_delayed(&self, pattern: &str, output: CommandOutput, delay: Duration) -> &Self {
        self.push(pattern, Reply::Output(output), delay)
    }

    pub fn on_spawn_error(&self, pattern: &str) -> &Self {
        self.push(pattern, Reply::SpawnError, Duration::ZERO)
    }

    fn push(&self, pattern: &str, reply: Reply, delay: Duration) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            reply,
            delay,
        });
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded command lines containing `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(pattern))
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String], _timeout: Duration) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let rule = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|rule| line.contains(&rule.pattern))
            .cloned();

        let Some(rule) = rule else {
            return Ok(CommandOutput::failure(127, format!("unexpected command: {line}")));
        };

        if !rule.delay.is_zero() {
            tokio::time::sleep(rule.delay).await;
        }

        match rule.reply {
            Reply::Output(output) => Ok(output),
            Reply::SpawnError => Err(DocksideError::Execution {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }
}
