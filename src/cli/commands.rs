// ABOUTME: Command implementations wiring CLI flags to the public API
// ABOUTME: Each command prints the resulting instance as pretty JSON

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::Path;
use tracing::info;

use crate::api::Workflows;
use crate::model::{Task, WorkflowInstance};
use crate::store;

/// Load a definition from disk and execute a fresh instance of it.
pub async fn run_definition(api: &Workflows, path: &Path) -> Result<()> {
    let definition = store::load_definition(path)
        .await
        .with_context(|| format!("failed to load definition from {}", path.display()))?;

    let instance = api.execute_definition(definition).await?;
    print_instance(&instance)?;
    Ok(())
}

/// Inject a task-update bundle into a live instance and resume it.
pub async fn resume_instance(api: &Workflows, id: &str, tasks_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(tasks_path)
        .await
        .with_context(|| format!("failed to read task updates from {}", tasks_path.display()))?;
    let updates: IndexMap<String, Task> =
        serde_json::from_str(&content).context("task update bundle is not valid JSON")?;

    let instance = api.update(id, updates).await?;
    print_instance(&instance)?;
    Ok(())
}

/// Print an instance, optionally rewound to an earlier save point.
pub async fn show_instance(api: &Workflows, id: &str, rewind: usize) -> Result<()> {
    let instance = api.get(id, rewind).await?;
    print_instance(&instance)?;
    Ok(())
}

pub async fn delete_instance(api: &Workflows, id: &str) -> Result<()> {
    api.delete(id).await?;
    info!(id, "instance deleted");
    Ok(())
}

pub async fn delete_all(api: &Workflows) -> Result<()> {
    api.delete_all().await?;
    info!("all instances deleted");
    Ok(())
}

fn print_instance(instance: &WorkflowInstance) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(instance)?);
    Ok(())
}
