// ABOUTME: Persistence layer for the trellis workflow engine
// ABOUTME: Abstracts definitions, current instances, and append-only history behind a trait

pub mod document;
pub mod error;
pub mod file;

pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use file::FileStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{InstanceStatus, WorkflowDefinition, WorkflowInstance};

/// Which backend persists workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    File,
    DocumentStore,
}

/// Store selection and connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub dir: PathBuf,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            dir: PathBuf::from("_data"),
            host: None,
            port: None,
        }
    }
}

impl StoreConfig {
    /// Build a configuration from `DB_TYPE`, `DB_DIR`, `DB_HOST`, and
    /// `DB_PORT`. Unknown `DB_TYPE` values fall back to the file backend.
    pub fn from_env() -> Self {
        let kind = match std::env::var("DB_TYPE").as_deref() {
            Ok("document-store") => StoreKind::DocumentStore,
            Ok("file") | Err(_) => StoreKind::File,
            Ok(other) => {
                warn!(db_type = other, "unknown DB_TYPE, falling back to file");
                StoreKind::File
            }
        };

        let dir = std::env::var("DB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("_data"));

        let host = std::env::var("DB_HOST").ok();
        let port = std::env::var("DB_PORT").ok().and_then(|p| p.parse().ok());

        Self {
            kind,
            dir,
            host,
            port,
        }
    }

    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn document_store(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::DocumentStore,
            dir: dir.into(),
            ..Self::default()
        }
    }
}

/// Filter for instance listing. Backends without query support fail with a
/// capability error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceQuery {
    pub name: Option<String>,
    pub status: Option<InstanceStatus>,
}

/// Durable persistence of definitions, current instances, and history.
///
/// Every `save_instance` writes both the current record (keyed by id) and a
/// timestamped historical record, so history is append-only and one record
/// long per save. Saves to a single id are serialized by the caller; the
/// engine owns one instance tree per execution pass.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Prepare the backend. Idempotent; must succeed before any other call.
    async fn init_store(&self) -> Result<()>;

    /// Release backend resources. Idempotent.
    async fn exit_store(&self) -> Result<()>;

    /// Upsert a definition by name.
    async fn save_definition(&self, definition: &WorkflowDefinition) -> Result<()>;

    async fn get_definition(&self, name: &str) -> Result<WorkflowDefinition>;

    /// Remove a definition by name; not-found is a failure.
    async fn delete_definition(&self, name: &str) -> Result<()>;

    /// Write the timestamped history record and the current record.
    async fn save_instance(&self, instance: &WorkflowInstance) -> Result<()>;

    /// Load the current record (`rewind == 0`) or the record `rewind` save
    /// points back, clamped to the oldest.
    async fn load_instance(&self, id: &str, rewind: usize) -> Result<WorkflowInstance>;

    /// Remove the current record and all its history.
    async fn delete_instance(&self, id: &str) -> Result<()>;

    /// Remove every instance and its history, leaving definitions intact.
    async fn delete_all(&self) -> Result<()>;

    /// Return instances matching a query.
    async fn find_instances(&self, query: &InstanceQuery) -> Result<Vec<WorkflowInstance>>;
}

/// Construct and initialize the backend selected by the configuration.
pub async fn init_store(config: &StoreConfig) -> Result<Arc<dyn WorkflowStore>> {
    let store: Arc<dyn WorkflowStore> = match config.kind {
        StoreKind::File => Arc::new(FileStore::new(config.dir.clone())),
        StoreKind::DocumentStore => Arc::new(DocumentStore::connect(config).await?),
    };
    store.init_store().await?;
    debug!(kind = ?config.kind, dir = %config.dir.display(), "store initialized");
    Ok(store)
}

/// Parse a definition from an external file, JSON or YAML auto-detected by
/// extension. Used by the driver and by the nested-workflow handler.
pub async fn load_definition(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    WorkflowDefinition::from_str(&content, WorkflowDefinition::is_yaml_path(path))
        .map_err(|e| StoreError::InvalidDefinition(e.to_string()))
}

/// Pick the history index for a rewind request, clamping to the oldest
/// record with a warning.
pub(crate) fn rewind_index(history_len: usize, rewind: usize, id: &str) -> usize {
    if rewind >= history_len {
        warn!(
            id,
            rewind, history_len, "rewind exceeds history, returning oldest record"
        );
        return 0;
    }
    history_len - 1 - rewind
}
