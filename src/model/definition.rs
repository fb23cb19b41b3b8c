// ABOUTME: Reusable workflow definition shape and parsing
// ABOUTME: Definitions are persisted by name, independently of running instances

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ModelError, Result};
use super::instance::{InstanceStatus, Task, WorkflowInstance};

/// A reusable workflow shape identified by name.
///
/// Instances are born from definitions; a definition carries no runtime
/// state (no id, no environment, no timing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(rename = "pre workflow", default, skip_serializing_if = "Option::is_none")]
    pub pre_workflow: Option<Task>,
    #[serde(rename = "post workflow", default, skip_serializing_if = "Option::is_none")]
    pub post_workflow: Option<Task>,
}

impl WorkflowDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::MissingField("name".to_string()));
        }
        Ok(())
    }

    /// Materialize a fresh instance from this definition. The id and
    /// environment are assigned by the driver on first execution.
    pub fn into_instance(self) -> WorkflowInstance {
        WorkflowInstance {
            id: None,
            name: self.name,
            status: InstanceStatus::Open,
            environment: IndexMap::new(),
            tasks: self.tasks,
            pre_workflow: self.pre_workflow,
            post_workflow: self.post_workflow,
        }
    }

    /// Parse a definition from serialized text, YAML or JSON depending on
    /// the `yaml` flag.
    pub fn from_str(content: &str, yaml: bool) -> Result<Self> {
        let definition: WorkflowDefinition = if yaml {
            serde_yaml::from_str(content)?
        } else {
            serde_json::from_str(content)?
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Whether a path points at a YAML source (`.yml`/`.yaml`); everything
    /// else is treated as JSON.
    pub fn is_yaml_path(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    #[test]
    fn test_parse_json_definition() {
        let json = r#"{
            "name": "backup",
            "tasks": {
                "dump": {"handler": "exec", "parameters": {"command": "pg_dump"}},
                "notify": {"handler": "log", "parameters": {"log": "done"}}
            }
        }"#;

        let definition = WorkflowDefinition::from_str(json, false).unwrap();
        assert_eq!(definition.name, "backup");
        assert_eq!(definition.tasks.len(), 2);
        // Insertion order is preserved; it is the scheduler scan order.
        let names: Vec<_> = definition.tasks.keys().collect();
        assert_eq!(names, vec!["dump", "notify"]);
    }

    #[test]
    fn test_parse_yaml_definition() {
        let yaml = r#"
name: greet
tasks:
  hello:
    handler: log
    parameters:
      log: hi
      level: info
"#;

        let definition = WorkflowDefinition::from_str(yaml, true).unwrap();
        assert_eq!(definition.name, "greet");
        let task = definition.tasks.get("hello").unwrap();
        assert_eq!(task.handler.as_deref(), Some("log"));
        assert_eq!(task.status, TaskStatus::Waiting);
    }

    #[test]
    fn test_rejects_empty_name() {
        let result = WorkflowDefinition::from_str(r#"{"name": "", "tasks": {}}"#, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_instance_carries_tasks() {
        let definition =
            WorkflowDefinition::from_str(r#"{"name": "wf", "tasks": {"t": {}}}"#, false).unwrap();
        let instance = definition.into_instance();
        assert!(instance.id.is_none());
        assert_eq!(instance.status, InstanceStatus::Open);
        assert!(instance.environment.is_empty());
        assert!(instance.tasks.contains_key("t"));
    }

    #[test]
    fn test_yaml_path_detection() {
        assert!(WorkflowDefinition::is_yaml_path(Path::new("a/wf.yaml")));
        assert!(WorkflowDefinition::is_yaml_path(Path::new("wf.yml")));
        assert!(!WorkflowDefinition::is_yaml_path(Path::new("wf.json")));
        assert!(!WorkflowDefinition::is_yaml_path(Path::new("wf")));
    }
}
