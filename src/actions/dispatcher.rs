use std::sync::Arc;

use log::{info, warn};

use super::launcher::{LaunchMode, LaunchRequest, Launcher};
use super::{ActionDefinition, ExecutionType};
use crate::error::RunnerError;

/// Result of handing one action to the launcher. `success` reflects whether
/// the process was created, not how it later exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub action_id: String,
    pub command: String,
    pub success: bool,
    pub pid: Option<u32>,
    pub error: Option<RunnerError>,
}

impl ExecutionOutcome {
    pub fn launched(action_id: &str, command: String, pid: Option<u32>) -> Self {
        Self {
            action_id: action_id.to_string(),
            command,
            success: true,
            pid,
            error: None,
        }
    }

    pub fn failed(action_id: &str, command: String, error: RunnerError) -> Self {
        Self {
            action_id: action_id.to_string(),
            command,
            success: false,
            pid: None,
            error: Some(error),
        }
    }

    pub fn message(&self) -> String {
        match &self.error {
            Some(e) => e.to_string(),
            None => match self.pid {
                Some(pid) => format!("started '{}' (pid {})", self.command, pid),
                None => format!("started '{}'", self.command),
            },
        }
    }
}

/// Id reported for ad-hoc command lines that belong to no action.
pub const SHELL_COMMAND_ID: &str = "exec";

/// Appends a positional argument, quoting it when it contains a space.
pub fn append_argument(command: &str, argument: &str) -> String {
    if argument.contains(' ') {
        format!("{} \"{}\"", command, argument)
    } else {
        format!("{} {}", command, argument)
    }
}

/// Routes resolved commands to a [`Launcher`] according to the action's
/// execution type.
#[derive(Clone)]
pub struct Dispatcher {
    launcher: Arc<dyn Launcher>,
}

impl Dispatcher {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }

    pub fn dispatch(
        &self,
        action: &ActionDefinition,
        resolved: &str,
        argument: Option<&str>,
    ) -> ExecutionOutcome {
        let Some(kind) = action.execution_type() else {
            warn!(
                "Refusing to run action '{}': unknown type '{}'",
                action.id, action.kind
            );
            return ExecutionOutcome::failed(
                &action.id,
                resolved.to_string(),
                RunnerError::UnknownExecutionType {
                    action_id: action.id.clone(),
                    kind: action.kind.clone(),
                },
            );
        };

        let resolved = resolved.trim();
        if resolved.is_empty() {
            warn!("Refusing to run action '{}': empty command", action.id);
            return ExecutionOutcome::failed(
                &action.id,
                String::new(),
                RunnerError::EmptyCommand(action.id.clone()),
            );
        }

        let argument = argument.filter(|a| !a.is_empty());
        let request = match kind {
            ExecutionType::Direct => LaunchRequest {
                mode: LaunchMode::Detached,
                command: resolved.to_string(),
            },
            ExecutionType::DirectWithArgument => LaunchRequest {
                mode: LaunchMode::Detached,
                command: match argument {
                    Some(arg) => append_argument(resolved, arg),
                    None => resolved.to_string(),
                },
            },
            ExecutionType::Shell => LaunchRequest {
                mode: LaunchMode::Terminal,
                command: resolved.to_string(),
            },
            ExecutionType::Elevated => LaunchRequest {
                mode: LaunchMode::Elevated,
                command: match argument {
                    Some(arg) => append_argument(resolved, arg),
                    None => resolved.to_string(),
                },
            },
        };

        let outcome = match self.launcher.launch(&request) {
            Ok(launched) => ExecutionOutcome::launched(&action.id, request.command, launched.pid),
            Err(e) => ExecutionOutcome::failed(&action.id, request.command, e),
        };

        info!(
            "Executed action '{}' ({}): success={}",
            action.id, kind, outcome.success
        );
        outcome
    }

    /// Runs a free-form command line through the platform shell, so pipes
    /// and redirections work.
    pub fn execute_command(&self, command: &str) -> ExecutionOutcome {
        let command = command.trim();
        if command.is_empty() {
            warn!("Refusing to run an empty command");
            return ExecutionOutcome::failed(
                SHELL_COMMAND_ID,
                String::new(),
                RunnerError::EmptyCommand(SHELL_COMMAND_ID.to_string()),
            );
        }

        let request = LaunchRequest {
            mode: LaunchMode::Shell,
            command: command.to_string(),
        };
        match self.launcher.launch(&request) {
            Ok(launched) => {
                ExecutionOutcome::launched(SHELL_COMMAND_ID, request.command, launched.pid)
            }
            Err(e) => ExecutionOutcome::failed(SHELL_COMMAND_ID, request.command, e),
        }
    }
}
