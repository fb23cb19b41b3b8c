// ABOUTME: Core workflow instance and task tree data structures
// ABOUTME: Defines status enums, timing fields, and truthy coercion for gate values

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    Open,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Waiting,
    Open,
    Executing,
    Paused,
    Completed,
    Error,
}

/// A running or terminal workflow tree derived from a definition.
///
/// The `tasks` mapping preserves insertion order, which is the deterministic
/// scan order for the scheduler. `environment` and `id` are assigned exactly
/// once, on first execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(rename = "pre workflow", default, skip_serializing_if = "Option::is_none")]
    pub pre_workflow: Option<Task>,
    #[serde(rename = "post workflow", default, skip_serializing_if = "Option::is_none")]
    pub post_workflow: Option<Task>,
}

/// A single node in the task tree.
///
/// `blocking`, `skipIf`, and `errorIf` hold raw values (bool, string, or
/// number) that are truthy-coerced after reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Task {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub tasks: IndexMap<String, Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_if: Option<Value>,
    pub ignore_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_opened: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_started: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_completed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<i64>,
    pub handler_executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// Coerce a raw gate value to a boolean.
///
/// Booleans pass through, numbers are true when non-zero, strings are true
/// when they spell `true` (case-insensitive) or parse to a non-zero number.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            if s.eq_ignore_ascii_case("true") {
                true
            } else if let Ok(n) = s.trim().parse::<f64>() {
                n != 0.0
            } else {
                false
            }
        }
        _ => false,
    }
}

pub fn truthy_opt(value: &Option<Value>) -> bool {
    value.as_ref().map(truthy).unwrap_or(false)
}

impl Task {
    /// Mark the task completed and fill in the timing accounting.
    pub fn mark_completed(&mut self, handler_executed: bool) {
        let now = Utc::now();
        self.status = TaskStatus::Completed;
        self.time_completed = Some(now);
        self.handler_executed = handler_executed;
        if handler_executed {
            if let Some(started) = self.time_started {
                self.handler_duration = Some((now - started).num_milliseconds());
            }
        }
        if let Some(opened) = self.time_opened {
            self.total_duration = Some((now - opened).num_milliseconds());
        }
    }

    /// Merge an injected task update into this task.
    ///
    /// Replaces `parameters`, `status`, `errorIf`, `skipIf`, and the child
    /// `tasks` mapping, then stamps `timeCompleted` and recomputes
    /// `totalDuration`. This is the resume path for paused tasks.
    pub fn apply_update(&mut self, update: Task) {
        self.parameters = update.parameters;
        self.status = update.status;
        self.error_if = update.error_if;
        self.skip_if = update.skip_if;
        self.tasks = update.tasks;

        let now = Utc::now();
        self.time_completed = Some(now);
        if let Some(opened) = self.time_opened {
            self.total_duration = Some((now - opened).num_milliseconds());
        }
    }
}

impl WorkflowInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            status: InstanceStatus::Open,
            environment: IndexMap::new(),
            tasks: IndexMap::new(),
            pre_workflow: None,
            post_workflow: None,
        }
    }

    /// Validate the instance shape before execution.
    ///
    /// Task statuses are guaranteed by the typed model (a task without an
    /// explicit status deserializes as `waiting`); what remains to check is
    /// the instance name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::MissingField("name".to_string()));
        }
        Ok(())
    }

    /// Every top-level task is completed; an empty tree is vacuously
    /// complete.
    pub fn is_complete(&self) -> bool {
        self.tasks
            .values()
            .all(|t| t.status == TaskStatus::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Waiting => write!(f, "waiting"),
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::Executing => write!(f, "executing"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Open => write!(f, "open"),
            InstanceStatus::Completed => write!(f, "completed"),
            InstanceStatus::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy_coercion() {
        assert!(truthy(&json!(true)));
        assert!(!truthy(&json!(false)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!(-2.5)));
        assert!(!truthy(&json!(0)));
        assert!(truthy(&json!("true")));
        assert!(truthy(&json!("TRUE")));
        assert!(truthy(&json!("1")));
        assert!(!truthy(&json!("false")));
        assert!(!truthy(&json!("nope")));
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!({"a": 1})));
    }

    #[test]
    fn test_task_field_names_serialize_camel_case() {
        let task = Task {
            skip_if: Some(json!(true)),
            ignore_error: true,
            handler: Some("log".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("skipIf").is_some());
        assert_eq!(value.get("ignoreError"), Some(&json!(true)));
        assert_eq!(value.get("status"), Some(&json!("waiting")));
    }

    #[test]
    fn test_instance_pre_post_field_names() {
        let mut instance = WorkflowInstance::new("wf");
        instance.pre_workflow = Some(Task::default());
        let value = serde_json::to_value(&instance).unwrap();
        assert!(value.get("pre workflow").is_some());
        assert!(value.get("post workflow").is_none());
    }

    #[test]
    fn test_missing_status_defaults_to_waiting() {
        let task: Task = serde_json::from_value(json!({"handler": "log"})).unwrap();
        assert_eq!(task.status, TaskStatus::Waiting);
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let instance = WorkflowInstance::new("  ");
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_empty_tree_is_vacuously_complete() {
        let mut instance = WorkflowInstance::new("empty");
        assert!(instance.is_complete());

        instance.tasks.insert("t".to_string(), Task::default());
        assert!(!instance.is_complete());

        instance.tasks.get_mut("t").unwrap().status = TaskStatus::Completed;
        assert!(instance.is_complete());
    }

    #[test]
    fn test_apply_update_replaces_listed_fields() {
        let mut task = Task {
            status: TaskStatus::Paused,
            handler: Some("test".to_string()),
            parameters: json!({"paused": true}),
            time_opened: Some(Utc::now()),
            ..Default::default()
        };

        let update = Task {
            status: TaskStatus::Executing,
            parameters: json!({"paused": false}),
            ..Default::default()
        };

        task.apply_update(update);

        assert_eq!(task.status, TaskStatus::Executing);
        assert_eq!(task.parameters, json!({"paused": false}));
        assert_eq!(task.handler.as_deref(), Some("test"));
        assert!(task.time_completed.is_some());
        assert!(task.total_duration.is_some());
    }
}
