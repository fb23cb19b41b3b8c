// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builders for workflow instances plus a file-store backed API fixture

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

use trellis::model::{Task, WorkflowInstance};
use trellis::store::StoreConfig;
use trellis::Workflows;

pub struct TestInstanceBuilder {
    instance: WorkflowInstance,
}

impl TestInstanceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            instance: WorkflowInstance::new(name),
        }
    }

    pub fn with_task(mut self, name: &str, task: Task) -> Self {
        self.instance.tasks.insert(name.to_string(), task);
        self
    }

    pub fn add_log_task(self, name: &str, message: &str) -> Self {
        let task = handler_task("log", json!({"log": message, "level": "info"}));
        self.with_task(name, task)
    }

    pub fn add_paused_task(self, name: &str) -> Self {
        let task = handler_task("test", json!({"paused": true}));
        self.with_task(name, task)
    }

    pub fn add_failing_task(self, name: &str) -> Self {
        let task = handler_task("test", json!({"error": true}));
        self.with_task(name, task)
    }

    pub fn with_pre_workflow(mut self, task: Task) -> Self {
        self.instance.pre_workflow = Some(task);
        self
    }

    pub fn with_post_workflow(mut self, task: Task) -> Self {
        self.instance.post_workflow = Some(task);
        self
    }

    pub fn build(self) -> WorkflowInstance {
        self.instance
    }
}

/// A leaf task with the given handler and parameters.
pub fn handler_task(handler: &str, parameters: Value) -> Task {
    Task {
        handler: Some(handler.to_string()),
        parameters,
        ..Default::default()
    }
}

/// A pure container task holding the given children.
pub fn container_task(children: Vec<(&str, Task)>) -> Task {
    let mut task = Task::default();
    for (name, child) in children {
        task.tasks.insert(name.to_string(), child);
    }
    task
}

pub fn blocking(mut task: Task) -> Task {
    task.blocking = Some(json!(true));
    task
}

/// API over a file store in a fresh temporary directory.
pub async fn file_api() -> (TempDir, Workflows) {
    let dir = TempDir::new().unwrap();
    let api = Workflows::init(StoreConfig::file(dir.path())).await.unwrap();
    (dir, api)
}

/// Number of history records the file store holds for an instance.
pub fn history_count(dir: &Path, id: &str) -> usize {
    let prefix = format!("{}_", id);
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .strip_prefix(&prefix)
                .map(|suffix| suffix.parse::<i64>().is_ok())
                .unwrap_or(false)
        })
        .count()
}
