// ABOUTME: Public API facade over the store and the execution driver
// ABOUTME: Exposes execute/update/get/delete/list plus definition management

use indexmap::IndexMap;
use std::sync::Arc;

use crate::engine::{ExecutionDriver, Result};
use crate::logging;
use crate::model::{Task, WorkflowDefinition, WorkflowInstance};
use crate::store::{self, InstanceQuery, StoreConfig, WorkflowStore};

/// The engine front door: owns the store connection and the driver.
///
/// Handler failures surface inside the returned instance (`status`, per-task
/// `errorMsg`); engine machinery failures are `Err`.
pub struct Workflows {
    store: Arc<dyn WorkflowStore>,
    driver: ExecutionDriver,
}

impl Workflows {
    /// Bootstrap the backend selected by the configuration.
    pub async fn init(config: StoreConfig) -> Result<Self> {
        let store = store::init_store(&config).await?;
        let driver = ExecutionDriver::new(store.clone());
        Ok(Self { store, driver })
    }

    /// Release the store. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.store.exit_store().await?;
        Ok(())
    }

    /// Execute an instance to completion, pause, or error; returns the
    /// final instance.
    pub async fn execute(&self, instance: WorkflowInstance) -> Result<WorkflowInstance> {
        self.driver.execute(instance).await
    }

    /// Materialize and execute an instance from a definition.
    pub async fn execute_definition(&self, definition: WorkflowDefinition) -> Result<WorkflowInstance> {
        self.driver.execute(definition.into_instance()).await
    }

    /// Inject task updates into a live instance and resume it.
    pub async fn update(
        &self,
        id: &str,
        tasks: IndexMap<String, Task>,
    ) -> Result<WorkflowInstance> {
        self.driver.update(id, tasks).await
    }

    /// Retrieve an instance, optionally rewound to a prior save point.
    pub async fn get(&self, id: &str, rewind: usize) -> Result<WorkflowInstance> {
        Ok(self.store.load_instance(id, rewind).await?)
    }

    /// List instances matching a query. Backends without query support fail
    /// with a capability error.
    pub async fn list(&self, query: &InstanceQuery) -> Result<Vec<WorkflowInstance>> {
        Ok(self.store.find_instances(query).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        Ok(self.store.delete_instance(id).await?)
    }

    pub async fn delete_all(&self) -> Result<()> {
        Ok(self.store.delete_all().await?)
    }

    pub async fn save_definition(&self, definition: &WorkflowDefinition) -> Result<()> {
        definition.validate()?;
        Ok(self.store.save_definition(definition).await?)
    }

    pub async fn get_definition(&self, name: &str) -> Result<WorkflowDefinition> {
        Ok(self.store.get_definition(name).await?)
    }

    pub async fn delete_definition(&self, name: &str) -> Result<()> {
        Ok(self.store.delete_definition(name).await?)
    }

    /// Adjust the active log level; unknown values fall back to `info` with
    /// a warning.
    pub fn set_log_level(&self, level: &str) {
        logging::set_log_level(level);
    }
}
