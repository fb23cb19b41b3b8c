// ABOUTME: Execution driver orchestrating validate, hooks, scheduler, and resume merging
// ABOUTME: Owns id assignment, environment snapshot, and the injected-update protocol

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{EngineError, Result};
use super::scheduler::{self, Scheduler};
use crate::handlers::HandlerRegistry;
use crate::model::{traverse, InstanceStatus, Task, TaskStatus, WorkflowInstance};
use crate::store::WorkflowStore;

enum Hook {
    Pre,
    Post,
}

enum HookOutcome {
    Done,
    Paused,
    Failed,
}

/// Drives a full execution pass over one instance tree.
pub struct ExecutionDriver {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<HandlerRegistry>,
}

impl ExecutionDriver {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        let registry = Arc::new(HandlerRegistry::with_builtins(store.clone()));
        Self { store, registry }
    }

    pub fn with_registry(store: Arc<dyn WorkflowStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Execute an instance to completion, pause, or error.
    ///
    /// The by-value argument keeps the caller's copy untouched. The
    /// environment snapshot and the id are assigned exactly once per
    /// instance lifetime.
    pub async fn execute(&self, mut instance: WorkflowInstance) -> Result<WorkflowInstance> {
        instance.validate()?;

        if instance.environment.is_empty() {
            instance.environment = std::env::vars().collect();
        }
        if instance.id.is_none() {
            instance.id = Some(Uuid::new_v4().to_string());
        }

        // Re-executing a fully completed tree (hooks included) is a no-op:
        // no new history, no status change.
        if instance.is_complete()
            && hook_done(&instance.pre_workflow)
            && hook_done(&instance.post_workflow)
        {
            debug!(id = ?instance.id, "every task already completed, nothing to do");
            return Ok(instance);
        }

        info!(id = ?instance.id, name = %instance.name, "executing workflow instance");

        match self.run_hook(&mut instance, Hook::Pre).await? {
            // A paused hook halts the pass like a paused task in the main
            // tree; the caller resumes it through `update`.
            HookOutcome::Paused => return Ok(instance),
            HookOutcome::Failed => {
                self.run_hook(&mut instance, Hook::Post).await?;
                return Ok(instance);
            }
            HookOutcome::Done => {}
        }

        if !instance.is_complete() {
            let scheduler = Scheduler::new(self.store.clone(), self.registry.clone());
            scheduler.run(&mut instance).await?;
        }
        self.run_hook(&mut instance, Hook::Post).await?;

        Ok(instance)
    }

    /// Merge an injected task-update bundle into the current instance and
    /// re-execute it. This is how a paused task resumes once an external
    /// event delivers its result.
    pub async fn update(
        &self,
        id: &str,
        updates: IndexMap<String, Task>,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.store.load_instance(id, 0).await?;
        if instance.status == InstanceStatus::Completed {
            return Err(EngineError::AlreadyCompleted(id.to_string()));
        }

        for (name, update) in updates {
            // The hooks live outside the tasks mapping; address them by
            // their serialized names.
            let target = match name.as_str() {
                "pre workflow" => instance.pre_workflow.as_mut(),
                "post workflow" => instance.post_workflow.as_mut(),
                _ => traverse::find_task_mut(&mut instance.tasks, &name),
            };
            match target {
                Some(task) => {
                    debug!(task = %name, "merging injected update");
                    task.apply_update(update);
                }
                None => debug!(task = %name, "injection target not found, ignoring"),
            }
        }

        instance.status = InstanceStatus::Open;
        self.execute(instance).await
    }

    /// Run the pre or post workflow task, if present, under the same
    /// dispatch rules as a leaf task, pausing included.
    async fn run_hook(&self, instance: &mut WorkflowInstance, hook: Hook) -> Result<HookOutcome> {
        let slot = match hook {
            Hook::Pre => instance.pre_workflow.take(),
            Hook::Post => instance.post_workflow.take(),
        };
        let Some(mut task) = slot else {
            return Ok(HookOutcome::Done);
        };

        if task.status == TaskStatus::Completed {
            put_back(instance, &hook, task);
            return Ok(HookOutcome::Done);
        }

        // A hook still paused from an earlier pass waits for injection,
        // exactly like a paused task in the main tree.
        if task.status == TaskStatus::Paused {
            put_back(instance, &hook, task);
            return Ok(HookOutcome::Paused);
        }

        let root = serde_json::to_value(&*instance).unwrap_or(Value::Null);
        let workflow_id = instance.id.clone().unwrap_or_default();
        let task_name = match hook {
            Hook::Pre => "pre workflow",
            Hook::Post => "post workflow",
        };

        let failed =
            scheduler::run_single(&self.registry, &workflow_id, task_name, &mut task, &root).await;
        let paused = task.status == TaskStatus::Paused;

        put_back(instance, &hook, task);

        if failed {
            instance.status = InstanceStatus::Error;
            self.store.save_instance(instance).await?;
            return Ok(HookOutcome::Failed);
        }
        if paused {
            // A completed status would block the resume path in `update`.
            if instance.status == InstanceStatus::Completed {
                instance.status = InstanceStatus::Open;
            }
            self.store.save_instance(instance).await?;
            return Ok(HookOutcome::Paused);
        }
        if matches!(hook, Hook::Post) {
            // The scheduler has already returned; record the post-hook state.
            self.store.save_instance(instance).await?;
        }
        Ok(HookOutcome::Done)
    }
}

fn put_back(instance: &mut WorkflowInstance, hook: &Hook, task: Task) {
    match hook {
        Hook::Pre => instance.pre_workflow = Some(task),
        Hook::Post => instance.post_workflow = Some(task),
    }
}

fn hook_done(hook: &Option<Task>) -> bool {
    hook.as_ref()
        .map_or(true, |task| task.status == TaskStatus::Completed)
}
