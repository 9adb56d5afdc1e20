use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use super::catalog::Catalog;
use super::dispatcher::{Dispatcher, ExecutionOutcome};
use super::template::{has_placeholder, resolve};
use super::{ActionDefinition, InputSpec, FILE_INPUT};
use crate::error::RunnerError;
use crate::events::{EventBus, RunnerEvent};

/// Values a caller has collected for an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidedInputs {
    pub values: HashMap<String, String>,
    /// A file path handed over directly, e.g. from a drop or an "open with".
    pub file: Option<String>,
}

impl ProvidedInputs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            file: Some(path.into()),
        }
    }

    pub fn with_value(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(id.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRequest {
    /// The action declares inputs that have not been supplied yet.
    NeedsInputs {
        action_id: String,
        inputs: Vec<InputSpec>,
        missing: Vec<String>,
    },
    Executed(ExecutionOutcome),
}

/// Ties lookup, input completeness, template resolution and dispatch together.
pub struct ActionRunner {
    catalog: Arc<Catalog>,
    dispatcher: Dispatcher,
    events: Arc<EventBus>,
}

impl ActionRunner {
    pub fn new(catalog: Arc<Catalog>, dispatcher: Dispatcher, events: Arc<EventBus>) -> Self {
        Self {
            catalog,
            dispatcher,
            events,
        }
    }

    pub fn request_execution(&self, action_id: &str, provided: &ProvidedInputs) -> ExecutionRequest {
        let Some(action) = self.catalog.lookup(action_id) else {
            warn!("Action not found: {}", action_id);
            let outcome = ExecutionOutcome::failed(
                action_id,
                String::new(),
                RunnerError::ActionNotFound(action_id.to_string()),
            );
            return self.finish(outcome);
        };

        let mut values = provided.values.clone();
        if let Some(file) = &provided.file {
            if action.declares_input(FILE_INPUT) {
                values
                    .entry(FILE_INPUT.to_string())
                    .or_insert_with(|| file.clone());
            }
        }

        if action.needs_inputs() {
            let missing: Vec<String> = action
                .inputs
                .iter()
                .filter(|spec| !values.contains_key(&spec.id))
                .map(|spec| spec.id.clone())
                .collect();

            if !missing.is_empty() {
                return self.request_inputs(action, missing);
            }
        }

        let resolved = resolve(&action.command, &values);

        // A file the template already consumed is not appended a second time.
        let argument = provided
            .file
            .as_deref()
            .or_else(|| values.get(FILE_INPUT).map(String::as_str))
            .filter(|_| !has_placeholder(&action.command, FILE_INPUT));

        let outcome = self.dispatcher.dispatch(&action, &resolved, argument);
        self.finish(outcome)
    }

    /// Runs a free-form command line through the platform shell. A blank
    /// line is reported as an execution error and nothing is started.
    pub fn execute_command(&self, command: &str) -> ExecutionOutcome {
        let outcome = self.dispatcher.execute_command(command);
        if let Some(RunnerError::EmptyCommand(_)) = &outcome.error {
            self.events.publish(RunnerEvent::ExecutionError {
                command: command.to_string(),
                message: "Empty command provided".to_string(),
            });
        }
        outcome
    }

    fn request_inputs(&self, action: ActionDefinition, missing: Vec<String>) -> ExecutionRequest {
        debug!("Action '{}' still needs {:?}", action.id, missing);
        self.events.publish(RunnerEvent::InputsRequired {
            action_id: action.id.clone(),
            inputs: action.inputs.clone(),
        });
        ExecutionRequest::NeedsInputs {
            action_id: action.id,
            inputs: action.inputs,
            missing,
        }
    }

    fn finish(&self, outcome: ExecutionOutcome) -> ExecutionRequest {
        self.events.publish(RunnerEvent::ActionExecuted {
            action_id: outcome.action_id.clone(),
            success: outcome.success,
        });
        ExecutionRequest::Executed(outcome)
    }
}
