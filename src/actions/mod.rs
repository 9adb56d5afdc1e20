use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

pub mod catalog;
pub mod dispatcher;
pub mod launcher;
pub mod loader;
pub mod runner;
pub mod template;

pub const DEFAULT_CATEGORY: &str = "tools";

/// Input id that a caller may satisfy by handing over a file path directly.
pub const FILE_INPUT: &str = "file";

/// One value the user has to provide before an action's command can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// A catalog entry as declared in the actions document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDefinition {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub command: String,
    /// Raw `type` tag. Kept as written so unknown tags survive loading and
    /// are rejected at dispatch time.
    #[serde(rename = "type")]
    pub kind: String,
    pub inputs: Vec<InputSpec>,
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

impl InputSpec {
    pub fn from_json(object: &Map<String, Value>) -> Self {
        Self {
            id: string_field(object, "id").unwrap_or_default(),
            label: string_field(object, "label"),
            kind: string_field(object, "type"),
            placeholder: string_field(object, "placeholder"),
        }
    }
}

impl ActionDefinition {
    /// Builds a definition from one JSON object, tolerating missing or
    /// mistyped fields the same way the catalog format always has.
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let inputs = object
            .get("inputs")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(InputSpec::from_json)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: string_field(object, "id").unwrap_or_default(),
            name: string_field(object, "name"),
            description: string_field(object, "description"),
            category: string_field(object, "category")
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            command: string_field(object, "command").unwrap_or_default(),
            kind: string_field(object, "type").unwrap_or_default(),
            inputs,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn execution_type(&self) -> Option<ExecutionType> {
        self.kind.parse().ok()
    }

    pub fn needs_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn declares_input(&self, id: &str) -> bool {
        self.inputs.iter().any(|input| input.id == id)
    }
}

/// How a resolved command is handed to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionType {
    /// Launch the program directly, detached.
    Direct,
    /// Run inside an interactive terminal that waits for a keypress.
    Shell,
    /// Run with OS privilege elevation.
    Elevated,
    /// Launch directly with one positional argument appended.
    DirectWithArgument,
}

impl ExecutionType {
    pub const ALL: [ExecutionType; 4] = [
        ExecutionType::Direct,
        ExecutionType::Shell,
        ExecutionType::Elevated,
        ExecutionType::DirectWithArgument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Direct => "direct",
            ExecutionType::Shell => "shell",
            ExecutionType::Elevated => "elevated",
            ExecutionType::DirectWithArgument => "direct_with_argument",
        }
    }
}

impl Display for ExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_execution_type_tags() {
        for kind in ExecutionType::ALL {
            assert_eq!(kind.as_str().parse::<ExecutionType>(), Ok(kind));
        }
        assert!("exe".parse::<ExecutionType>().is_err());
        assert!("Direct".parse::<ExecutionType>().is_err());
    }

    #[test]
    fn test_definition_defaults() {
        let action = ActionDefinition::from_json(&object(json!({
            "id": "calc",
            "command": "calc",
            "type": "direct"
        })));

        assert_eq!(action.category, DEFAULT_CATEGORY);
        assert_eq!(action.display_name(), "calc");
        assert_eq!(action.execution_type(), Some(ExecutionType::Direct));
        assert!(!action.needs_inputs());
    }

    #[test]
    fn test_mistyped_fields_are_tolerated() {
        let action = ActionDefinition::from_json(&object(json!({
            "id": 7,
            "category": false,
            "type": "teleport",
            "inputs": [{"id": "file", "label": "File", "type": "path"}, 3, "x"]
        })));

        assert_eq!(action.id, "");
        assert_eq!(action.command, "");
        assert_eq!(action.category, DEFAULT_CATEGORY);
        assert_eq!(action.execution_type(), None);
        assert_eq!(action.inputs.len(), 1);
        assert_eq!(action.inputs[0].label.as_deref(), Some("File"));
        assert_eq!(action.inputs[0].kind.as_deref(), Some("path"));
        assert!(action.declares_input(FILE_INPUT));
    }
}
