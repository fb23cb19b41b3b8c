// ABOUTME: File handler for basic filesystem operations from a task
// ABOUTME: Supports read, write, append, delete, and copy on a single path

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{HandlerError, Result, TaskHandler};
use crate::model::Task;

pub struct FileHandler;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FileOperation {
    Read,
    Write,
    Append,
    Delete,
    Copy,
}

#[derive(Debug, Deserialize)]
struct FileParameters {
    operation: FileOperation,
    path: PathBuf,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    to: Option<PathBuf>,
}

#[async_trait]
impl TaskHandler for FileHandler {
    async fn handle(&self, workflow_id: &str, task_name: &str, task: &mut Task) -> Result<()> {
        let params: FileParameters = serde_json::from_value(task.parameters.clone())
            .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;

        debug!(
            workflow = workflow_id,
            task = task_name,
            path = %params.path.display(),
            "file operation"
        );

        match params.operation {
            FileOperation::Read => {
                let content = fs::read_to_string(&params.path).await?;
                if let Some(map) = task.parameters.as_object_mut() {
                    map.insert("content".to_string(), json!(content));
                }
            }
            FileOperation::Write => {
                let content = params.content.unwrap_or_default();
                fs::write(&params.path, content).await?;
            }
            FileOperation::Append => {
                let content = params.content.unwrap_or_default();
                let mut file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&params.path)
                    .await?;
                file.write_all(content.as_bytes()).await?;
            }
            FileOperation::Delete => {
                fs::remove_file(&params.path).await?;
            }
            FileOperation::Copy => {
                let to = params.to.ok_or_else(|| {
                    HandlerError::InvalidParameters("copy requires a to path".to_string())
                })?;
                fs::copy(&params.path, &to).await?;
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");

        let mut write_task = Task {
            parameters: json!({
                "operation": "write",
                "path": &path,
                "content": "persisted"
            }),
            ..Default::default()
        };
        FileHandler.handle("wf", "w", &mut write_task).await.unwrap();

        let mut read_task = Task {
            parameters: json!({"operation": "read", "path": &path}),
            ..Default::default()
        };
        FileHandler.handle("wf", "r", &mut read_task).await.unwrap();

        assert_eq!(
            read_task.parameters.get("content"),
            Some(&json!("persisted"))
        );
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");

        for chunk in ["one", "two"] {
            let mut task = Task {
                parameters: json!({
                    "operation": "append",
                    "path": &path,
                    "content": chunk
                }),
                ..Default::default()
            };
            FileHandler.handle("wf", "a", &mut task).await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "onetwo");
    }

    #[tokio::test]
    async fn test_read_missing_file_errors() {
        let mut task = Task {
            parameters: json!({"operation": "read", "path": "/definitely/not/here"}),
            ..Default::default()
        };
        let err = FileHandler.handle("wf", "r", &mut task).await.unwrap_err();
        assert!(matches!(err, HandlerError::Io(_)));
    }
}
