//! Dockside error types

use crate::model::VmStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocksideError {
    #[error("failed to run `{program}`: {source}")]
    Execution {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed (exit code {code:?}): {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("could not parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("VM '{name}' cannot {action} while {status}")]
    InvalidTransition {
        name: String,
        action: &'static str,
        status: VmStatus,
    },

    #[error("VM '{name}' is busy with another lifecycle operation")]
    Busy { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocksideError {
    /// Message shown to the frontend when an operation fails.
    ///
    /// A failed command reports its own stderr; an empty stderr falls back
    /// to `fallback`. Every other error reports its display text.
    pub fn failure_message(&self, fallback: &str) -> String {
        match self {
            DocksideError::NonZeroExit { stderr, .. } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    fallback.to_string()
                } else {
                    stderr.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocksideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_prefers_stderr() {
        let err = DocksideError::NonZeroExit {
            program: "docker".to_string(),
            code: Some(1),
            stderr: "Error: No such container: web\n".to_string(),
        };
        assert_eq!(
            err.failure_message("Remove failed"),
            "Error: No such container: web"
        );
    }

    #[test]
    fn test_failure_message_falls_back_on_empty_stderr() {
        let err = DocksideError::NonZeroExit {
            program: "colima".to_string(),
            code: Some(1),
            stderr: "  \n".to_string(),
        };
        assert_eq!(err.failure_message("Start failed"), "Start failed");
    }

    #[test]
    fn test_failure_message_for_guard_errors() {
        let err = DocksideError::Busy {
            name: "default".to_string(),
        };
        assert_eq!(
            err.failure_message("ignored"),
            "VM 'default' is busy with another lifecycle operation"
        );
    }
}
