// ABOUTME: Embedded document store backend over SQLite
// ABOUTME: Three collections: definitions, current instances, and append-only history

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::error::{Result, StoreError};
use super::{rewind_index, InstanceQuery, StoreConfig, WorkflowStore};
use crate::model::{WorkflowDefinition, WorkflowInstance};

const DB_FILE: &str = "trellis.db";

/// Document-style backend storing records as JSON blobs.
///
/// History rows carry a synthetic id `<origId>_<epoch-ms>` plus the origin
/// workflow id for lookup; insertion order (`seq`) is the authoritative
/// chronology.
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Open (or create) the database under the configured directory.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.dir).await?;

        let options = SqliteConnectOptions::new()
            .filename(config.dir.join(DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    async fn history_bodies(&self, id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT body FROM instances_history WHERE workflow_id = ?1 ORDER BY seq ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("body").map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl WorkflowStore for DocumentStore {
    async fn init_store(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS definitions (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS instances (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                body TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS instances_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                workflow_id TEXT NOT NULL,
                body TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_instances_history_workflow
             ON instances_history (workflow_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exit_store(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn save_definition(&self, definition: &WorkflowDefinition) -> Result<()> {
        let body = serde_json::to_string(definition)?;
        sqlx::query(
            "INSERT INTO definitions (name, body) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body",
        )
        .bind(&definition.name)
        .bind(&body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_definition(&self, name: &str) -> Result<WorkflowDefinition> {
        let row = sqlx::query("SELECT body FROM definitions WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::DefinitionNotFound(name.to_string()))?;

        let body: String = row.try_get("body")?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn delete_definition(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM definitions WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::DefinitionNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn save_instance(&self, instance: &WorkflowInstance) -> Result<()> {
        let id = instance.id.as_deref().ok_or(StoreError::MissingId)?;
        let body = serde_json::to_string(instance)?;
        let history_id = format!("{}_{}", id, Utc::now().timestamp_millis());

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO instances_history (id, workflow_id, body) VALUES (?1, ?2, ?3)")
            .bind(&history_id)
            .bind(id)
            .bind(&body)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO instances (id, name, status, body) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 status = excluded.status,
                 body = excluded.body",
        )
        .bind(id)
        .bind(&instance.name)
        .bind(instance.status.to_string())
        .bind(&body)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(id, history_id = %history_id, "instance saved");
        Ok(())
    }

    async fn load_instance(&self, id: &str, rewind: usize) -> Result<WorkflowInstance> {
        if rewind == 0 {
            let row = sqlx::query("SELECT body FROM instances WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::InstanceNotFound(id.to_string()))?;
            let body: String = row.try_get("body")?;
            return Ok(serde_json::from_str(&body)?);
        }

        let history = self.history_bodies(id).await?;
        if history.is_empty() {
            return Err(StoreError::InstanceNotFound(id.to_string()));
        }
        let body = &history[rewind_index(history.len(), rewind, id)];
        Ok(serde_json::from_str(body)?)
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM instances WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::InstanceNotFound(id.to_string()));
        }

        sqlx::query("DELETE FROM instances_history WHERE workflow_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM instances")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM instances_history")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_instances(&self, query: &InstanceQuery) -> Result<Vec<WorkflowInstance>> {
        let mut sql = String::from("SELECT body FROM instances WHERE 1 = 1");
        if query.name.is_some() {
            sql.push_str(" AND name = ?1");
        }
        if query.status.is_some() {
            sql.push_str(if query.name.is_some() {
                " AND status = ?2"
            } else {
                " AND status = ?1"
            });
        }

        let mut q = sqlx::query(&sql);
        if let Some(name) = &query.name {
            q = q.bind(name);
        }
        if let Some(status) = &query.status {
            q = q.bind(status.to_string());
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let body: String = row.try_get("body")?;
                Ok(serde_json::from_str::<WorkflowInstance>(&body)?)
            })
            .collect()
    }
}
