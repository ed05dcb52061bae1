//! Uniform result envelopes returned to the frontend

use crate::error::Result;
use crate::exec::CommandOutput;
use serde::{Deserialize, Serialize};

/// Result of every mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub succeeded: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
        }
    }

    /// Build the envelope from a finished command.
    ///
    /// On failure the message is the command's stderr, or `failure` when
    /// stderr is empty. A spawn error reports its own text.
    pub fn from_output(output: &Result<CommandOutput>, success: &str, failure: &str) -> Self {
        match output {
            Ok(out) if out.succeeded() => Self::ok(success),
            Ok(out) => {
                let stderr = out.stderr.trim();
                if stderr.is_empty() {
                    Self::failed(failure)
                } else {
                    Self::failed(stderr)
                }
            }
            Err(e) => Self::failed(e.failure_message(failure)),
        }
    }
}

/// Result of a log query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResult {
    pub succeeded: bool,
    pub text: String,
}

impl LogsResult {
    /// stdout when present, otherwise stderr
    pub fn from_output(output: &Result<CommandOutput>) -> Self {
        match output {
            Ok(out) => Self {
                succeeded: out.succeeded(),
                text: if out.stdout.is_empty() {
                    out.stderr.clone()
                } else {
                    out.stdout.clone()
                },
            },
            Err(e) => Self {
                succeeded: false,
                text: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocksideError;

    #[test]
    fn test_envelope_from_output() {
        let ok = OperationResult::from_output(&Ok(CommandOutput::success("abc")), "Done", "Failed");
        assert_eq!(ok, OperationResult::ok("Done"));

        let failed = OperationResult::from_output(
            &Ok(CommandOutput::failure(1, "no such volume\n")),
            "Done",
            "Failed",
        );
        assert_eq!(failed, OperationResult::failed("no such volume"));

        let silent =
            OperationResult::from_output(&Ok(CommandOutput::failure(1, "")), "Done", "Failed");
        assert_eq!(silent, OperationResult::failed("Failed"));
    }

    #[test]
    fn test_envelope_from_spawn_error() {
        let err = Err(DocksideError::Execution {
            program: "docker".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });
        let result = OperationResult::from_output(&err, "Done", "Failed");
        assert!(!result.succeeded);
        assert!(result.message.contains("docker"));
    }

    #[test]
    fn test_logs_prefer_stdout() {
        let mut out = CommandOutput::success("line 1\nline 2\n");
        out.stderr = "warning".to_string();
        let logs = LogsResult::from_output(&Ok(out));
        assert!(logs.succeeded);
        assert_eq!(logs.text, "line 1\nline 2\n");

        let logs = LogsResult::from_output(&Ok(CommandOutput::failure(1, "No such container")));
        assert!(!logs.succeeded);
        assert_eq!(logs.text, "No such container");
    }

    #[test]
    fn test_envelope_wire_shape() {
        let json = serde_json::to_value(OperationResult::ok("Volume created")).unwrap();
        assert_eq!(json, serde_json::json!({"succeeded": true, "message": "Volume created"}));
    }
}
