use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by catalog loading, lookup and dispatch.
///
/// None of these abort the process: callers receive them as part of a
/// structured outcome and decide what to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("actions file not found: {}", .0.display())]
    CatalogNotFound(PathBuf),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("invalid actions document {}: {reason}", .path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("empty command for action {0}")]
    EmptyCommand(String),

    #[error("unknown execution type '{kind}' for action {action_id}")]
    UnknownExecutionType { action_id: String, kind: String },

    #[error("failed to launch '{command}': {reason}")]
    LaunchFailure { command: String, reason: String },
}

impl RunnerError {
    pub fn launch_failure(command: &str, reason: impl ToString) -> Self {
        Self::LaunchFailure {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CatalogNotFound(_) | Self::ActionNotFound(_))
    }
}
