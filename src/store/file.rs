// ABOUTME: File-backed workflow store, one file per record
// ABOUTME: Definitions are <name>.def, instances <id>, history <id>_<epoch-ms>

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::error::{Result, StoreError};
use super::{rewind_index, InstanceQuery, WorkflowStore};
use crate::model::{WorkflowDefinition, WorkflowInstance};

const DEFINITION_EXT: &str = "def";

/// Store backed by a flat directory. History files carry an epoch-ms
/// suffix, so lexicographic order equals chronological order; instance
/// files are recognized by the absence of the `.def` extension.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, DEFINITION_EXT))
    }

    fn instance_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn is_definition(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXT)
    }

    async fn read_instance(&self, path: &Path, id: &str) -> Result<WorkflowInstance> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::InstanceNotFound(id.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// History file paths for one instance, ordered oldest first.
    async fn history_paths(&self, id: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}_", id);
        let mut stamped = Vec::new();

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(suffix) = name.strip_prefix(&prefix) {
                if let Ok(stamp) = suffix.parse::<i64>() {
                    stamped.push((stamp, entry.path()));
                }
            }
        }

        stamped.sort_by_key(|(stamp, _)| *stamp);
        Ok(stamped.into_iter().map(|(_, path)| path).collect())
    }
}

#[async_trait]
impl WorkflowStore for FileStore {
    async fn init_store(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn exit_store(&self) -> Result<()> {
        Ok(())
    }

    async fn save_definition(&self, definition: &WorkflowDefinition) -> Result<()> {
        let content = serde_json::to_string_pretty(definition)?;
        fs::write(self.definition_path(&definition.name), content).await?;
        Ok(())
    }

    async fn get_definition(&self, name: &str) -> Result<WorkflowDefinition> {
        let content = fs::read_to_string(self.definition_path(name))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::DefinitionNotFound(name.to_string())
                } else {
                    StoreError::Io(e)
                }
            })?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn delete_definition(&self, name: &str) -> Result<()> {
        fs::remove_file(self.definition_path(name))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::DefinitionNotFound(name.to_string())
                } else {
                    StoreError::Io(e)
                }
            })
    }

    async fn save_instance(&self, instance: &WorkflowInstance) -> Result<()> {
        let id = instance.id.as_deref().ok_or(StoreError::MissingId)?;
        let content = serde_json::to_string_pretty(instance)?;

        // Bump the stamp on collision so two saves in the same millisecond
        // keep distinct history records.
        let mut stamp = Utc::now().timestamp_millis();
        let mut history_path = self.dir.join(format!("{}_{}", id, stamp));
        while fs::try_exists(&history_path).await? {
            stamp += 1;
            history_path = self.dir.join(format!("{}_{}", id, stamp));
        }

        fs::write(&history_path, &content).await?;
        fs::write(self.instance_path(id), &content).await?;
        debug!(id, stamp, "instance saved");
        Ok(())
    }

    async fn load_instance(&self, id: &str, rewind: usize) -> Result<WorkflowInstance> {
        if rewind == 0 {
            return self.read_instance(&self.instance_path(id), id).await;
        }

        let history = self.history_paths(id).await?;
        if history.is_empty() {
            return Err(StoreError::InstanceNotFound(id.to_string()));
        }
        let path = &history[rewind_index(history.len(), rewind, id)];
        self.read_instance(path, id).await
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        fs::remove_file(self.instance_path(id)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::InstanceNotFound(id.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;

        for path in self.history_paths(id).await? {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && !Self::is_definition(&path) {
                fs::remove_file(path).await?;
            }
        }
        Ok(())
    }

    async fn find_instances(&self, _query: &InstanceQuery) -> Result<Vec<WorkflowInstance>> {
        Err(StoreError::Capability {
            backend: "file",
            operation: "find_instances",
        })
    }
}
