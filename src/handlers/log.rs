// ABOUTME: Log handler emitting a task-provided message through tracing

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{Result, TaskHandler};
use crate::model::Task;
use crate::reference::value_to_string;

pub struct LogHandler;

#[async_trait]
impl TaskHandler for LogHandler {
    async fn handle(&self, workflow_id: &str, task_name: &str, task: &mut Task) -> Result<()> {
        let message = task
            .parameters
            .get("log")
            .map(value_to_string)
            .unwrap_or_default();
        let level = task
            .parameters
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("info");

        match level {
            "debug" | "verbose" => debug!(workflow = workflow_id, task = task_name, "{}", message),
            "warn" | "warning" => warn!(workflow = workflow_id, task = task_name, "{}", message),
            "error" => error!(workflow = workflow_id, task = task_name, "{}", message),
            _ => info!(workflow = workflow_id, task = task_name, "{}", message),
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
