// ABOUTME: Nested workflow handler launching a sub-workflow from a task
// ABOUTME: Loads a definition from a file or by saved name and executes it against the same store

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{HandlerError, Result, TaskHandler};
use crate::engine::ExecutionDriver;
use crate::model::{InstanceStatus, Task};
use crate::store::{self, WorkflowStore};

/// Launches a sub-workflow. `parameters.file` points at a JSON/YAML
/// definition on disk; `parameters.definition` names a saved definition.
/// The child instance id and final status are recorded back into
/// parameters.
pub struct WorkflowHandler {
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowHandler {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskHandler for WorkflowHandler {
    async fn handle(&self, workflow_id: &str, task_name: &str, task: &mut Task) -> Result<()> {
        let definition = if let Some(path) = task.parameters.get("file").and_then(Value::as_str) {
            store::load_definition(path).await?
        } else if let Some(name) = task.parameters.get("definition").and_then(Value::as_str) {
            self.store.get_definition(name).await?
        } else {
            return Err(HandlerError::InvalidParameters(
                "workflow handler requires file or definition".to_string(),
            ));
        };

        info!(
            workflow = workflow_id,
            task = task_name,
            child = %definition.name,
            "launching nested workflow"
        );

        let driver = ExecutionDriver::new(self.store.clone());
        let child = driver
            .execute(definition.into_instance())
            .await
            .map_err(|e| HandlerError::Reported(e.to_string()))?;

        if let Some(map) = task.parameters.as_object_mut() {
            map.insert("instanceId".to_string(), json!(child.id));
            map.insert("instanceStatus".to_string(), json!(child.status.to_string()));
        }

        if child.status == InstanceStatus::Error {
            return Err(HandlerError::Reported(format!(
                "nested workflow {} failed",
                child.name
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "workflow"
    }
}
