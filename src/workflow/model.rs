//! Workflow Data Model
//!
//! Typed view of a parsed tabular document, plus the registry that
//! imported workflows are added to.
//!
//! # Example Tabular Format
//!
//! ```text
//! Workflow,,Name,Description,Tasks
//! ,,deploy,Build and ship,%Tasks
//! []Tasks,,Name,Actions
//! ,,build,%BuildActions
//! []BuildActions,,Service,Action,Request
//! ,,exec,run,#req/build.json
//! ```
//!
//! Keys are accepted both capitalized (`Name`) and lower case (`name`).

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::WorkflowError;

/// A single service call inside a task.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Action {
    /// Service handling the call (e.g. "exec", "http")
    #[serde(default, alias = "Service")]
    pub service: String,

    /// Operation requested from the service
    #[serde(default, alias = "Action")]
    pub action: String,

    #[serde(default, alias = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Free-form request payload
    #[serde(default, alias = "Request", skip_serializing_if = "Value::is_null")]
    pub request: Value,
}

impl Action {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into().trim().to_string(),
            action: action.into().trim().to_string(),
            ..Default::default()
        }
    }
}

/// A named group of actions.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Task {
    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, alias = "Actions")]
    pub actions: Vec<Action>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// A complete workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Workflow-level data available to tasks
    #[serde(default, alias = "Data", skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,

    /// Ordered list of tasks
    #[serde(default, alias = "Tasks")]
    pub tasks: Vec<Task>,
}

impl Workflow {
    /// Creates a new empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Default::default()
        }
    }

    /// Converts a parsed generic document into a workflow.
    pub fn from_document(document: Map<String, Value>) -> Result<Self, WorkflowError> {
        serde_json::from_value(Value::Object(document)).map_err(WorkflowError::Convert)
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Gets a task by name.
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Unique services used across all tasks, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self
            .tasks
            .iter()
            .flat_map(|t| t.actions.iter().map(|a| a.service.clone()))
            .filter(|s| !s.is_empty())
            .collect();
        services.sort();
        services.dedup();
        services
    }

    /// Returns the number of tasks in the workflow.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the workflow has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Destination for workflows pulled in by `import` lines.
pub trait WorkflowRegistry {
    fn register(&mut self, workflow: Workflow) -> Result<(), WorkflowError>;
}

/// Registry keeping workflows in memory, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    workflows: HashMap<String, Workflow>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// Registered workflow names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

impl WorkflowRegistry for InMemoryRegistry {
    fn register(&mut self, workflow: Workflow) -> Result<(), WorkflowError> {
        if workflow.name.trim().is_empty() {
            return Err(WorkflowError::Registration {
                name: workflow.name,
                reason: "workflow name is required".to_string(),
            });
        }
        if self.workflows.contains_key(&workflow.name) {
            warn!("Replacing registered workflow '{}'", workflow.name);
        }
        info!(
            "Registered workflow '{}' ({} tasks)",
            workflow.name,
            workflow.tasks.len()
        );
        self.workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_from_document_capitalized_keys() {
        let workflow = Workflow::from_document(document(json!({
            "Name": "deploy",
            "Description": "Build and ship",
            "Tasks": [
                {
                    "Name": "build",
                    "Actions": [
                        {"Service": "exec", "Action": "run", "Request": {"commands": ["make"]}}
                    ]
                }
            ]
        })))
        .unwrap();

        assert_eq!(workflow.name, "deploy");
        assert_eq!(workflow.description, "Build and ship");
        assert_eq!(workflow.len(), 1);
        let task = workflow.get_task("build").unwrap();
        assert_eq!(task.actions[0].service, "exec");
        assert_eq!(task.actions[0].request, json!({"commands": ["make"]}));
    }

    #[test]
    fn test_from_document_lower_case_and_unknown_keys() {
        let workflow = Workflow::from_document(document(json!({
            "name": "flow",
            "data": {"env": "dev"},
            "owner": "ignored"
        })))
        .unwrap();

        assert_eq!(workflow.name, "flow");
        assert_eq!(workflow.data["env"], json!("dev"));
        assert!(workflow.is_empty());
    }

    #[test]
    fn test_from_document_wrong_shape() {
        let result = Workflow::from_document(document(json!({"Tasks": "not a list"})));
        assert!(matches!(result, Err(WorkflowError::Convert(_))));
    }

    #[test]
    fn test_services_unique_sorted() {
        let workflow = Workflow::new("flow")
            .with_task(
                Task::new("a")
                    .with_action(Action::new("http", "get"))
                    .with_action(Action::new("exec", "run")),
            )
            .with_task(Task::new("b").with_action(Action::new("exec", "run")));

        assert_eq!(workflow.services(), vec!["exec", "http"]);
    }

    #[test]
    fn test_registry_register_and_replace() {
        let mut registry = InMemoryRegistry::new();
        registry.register(Workflow::new("common")).unwrap();
        registry
            .register(Workflow::new("common").with_task(Task::new("x")))
            .unwrap();
        registry.register(Workflow::new("other")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["common", "other"]);
        assert_eq!(registry.get("common").unwrap().len(), 1);
    }

    #[test]
    fn test_registry_requires_name() {
        let mut registry = InMemoryRegistry::new();
        let err = registry.register(Workflow::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::Registration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let workflow = Workflow::new("flow").with_task(Task::new("a"));
        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(
            value,
            json!({"name": "flow", "tasks": [{"name": "a", "actions": []}]})
        );
    }
}
