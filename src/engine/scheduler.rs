// ABOUTME: Ready-task scheduler driving an instance tree to completion
// ABOUTME: Persists save points, opens the frontier, and dispatches runnable tasks in parallel

use chrono::Utc;
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::Result;
use crate::handlers::{self, HandlerRegistry};
use crate::model::traverse;
use crate::model::{
    truthy, truthy_opt, InstanceStatus, Task, TaskPath, TaskStatus, WorkflowInstance,
};
use crate::store::WorkflowStore;

/// The core state machine: persist, open the frontier, dispatch every
/// runnable task in parallel, collect the batch, and loop until nothing is
/// runnable.
pub struct Scheduler {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<HandlerRegistry>,
}

enum PreparedAction {
    Skip,
    GateError,
    Dispatch,
}

impl Scheduler {
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Drive the instance until no task is runnable.
    ///
    /// Returns `Err` only for store failures; handler failures are recorded
    /// on the instance (`status`, per-task `errorMsg`) and return `Ok`.
    pub async fn run(&self, instance: &mut WorkflowInstance) -> Result<()> {
        loop {
            // Save point A, before any dispatch in this pass.
            self.store.save_instance(instance).await?;

            if traverse::any_paused(&instance.tasks) {
                debug!(id = ?instance.id, "instance has paused tasks, returning control");
                return Ok(());
            }

            let root = instance_snapshot(instance);
            open_frontier(&mut instance.tasks, &root);

            let runnables = collect_runnables(&instance.tasks);
            if runnables.is_empty() {
                if instance
                    .tasks
                    .values()
                    .all(|t| t.status == TaskStatus::Completed)
                {
                    instance.status = InstanceStatus::Completed;
                    info!(id = ?instance.id, "workflow instance completed");
                }
                // Save point C, on idle.
                self.store.save_instance(instance).await?;
                return Ok(());
            }

            let failed = self.run_batch(instance, runnables).await;
            if failed {
                instance.status = InstanceStatus::Error;
                // Save point B, on the error path.
                self.store.save_instance(instance).await?;
                return Ok(());
            }
        }
    }

    /// Prepare and dispatch one batch of runnables. Returns true when any
    /// task in the batch failed hard.
    async fn run_batch(&self, instance: &mut WorkflowInstance, runnables: Vec<TaskPath>) -> bool {
        let workflow_id = instance.id.clone().unwrap_or_default();
        let mut failed = false;
        let mut dispatches: Vec<(TaskPath, Task)> = Vec::new();

        // Preparation is sequential in tie-break order: each task resolves
        // its references against the tree as it stands at the start of its
        // own dispatch.
        for path in runnables {
            let root = instance_snapshot(instance);
            let Some(task) = traverse::task_at_path_mut(&mut instance.tasks, &path) else {
                continue;
            };
            match prepare_task(task, &root) {
                PreparedAction::GateError => failed |= apply_gate_error(task),
                PreparedAction::Skip => task.mark_completed(false),
                PreparedAction::Dispatch => dispatches.push((path, task.clone())),
            }
        }

        let mut paths = Vec::new();
        let mut handles = Vec::new();
        for (path, mut task) in dispatches {
            let registry = Arc::clone(&self.registry);
            let wid = workflow_id.clone();
            let name = path.last().cloned().unwrap_or_default();
            paths.push(path);
            handles.push(tokio::spawn(async move {
                let outcome = invoke(&registry, &wid, &name, &mut task).await;
                (task, outcome)
            }));
        }

        for (path, joined) in paths.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok((mut task, outcome)) => {
                    failed |= apply_outcome(&mut task, outcome);
                    if let Some(slot) = traverse::task_at_path_mut(&mut instance.tasks, &path) {
                        *slot = task;
                    }
                }
                Err(join_error) => {
                    error!(error = %join_error, "handler task aborted");
                    if let Some(slot) = traverse::task_at_path_mut(&mut instance.tasks, &path) {
                        fail_task(slot, format!("handler aborted: {}", join_error));
                    }
                    failed = true;
                }
            }
        }

        failed
    }
}

/// Open waiting tasks at this level and recurse into open subtrees.
///
/// A blocking task that is not yet completed halts the sibling scan at its
/// level; later siblings stay waiting until a future pass.
fn open_frontier(tasks: &mut IndexMap<String, Task>, root: &Value) {
    for (_, task) in tasks.iter_mut() {
        match task.status {
            TaskStatus::Waiting => {
                task.status = TaskStatus::Open;
                task.time_opened = Some(Utc::now());
                open_frontier(&mut task.tasks, root);
            }
            TaskStatus::Open => open_frontier(&mut task.tasks, root),
            _ => {}
        }
        if blocking_active(task, root) && task.status != TaskStatus::Completed {
            break;
        }
    }
}

/// Evaluate `blocking` with references resolved against the pass-entry
/// snapshot, so a templated value takes effect on the pass that opens the
/// task. The field itself is rewritten later, at dispatch.
fn blocking_active(task: &Task, root: &Value) -> bool {
    match &task.blocking {
        Some(value) => {
            let mut resolved = value.clone();
            crate::reference::resolve_value(&mut resolved, root);
            truthy(&resolved)
        }
        None => false,
    }
}

/// Deep-scan for runnable tasks: open (or executing, after a resume
/// injection) with every descendant completed. Leaf-first completion drives
/// parent completion.
fn collect_runnables(tasks: &IndexMap<String, Task>) -> Vec<TaskPath> {
    fn inner(tasks: &IndexMap<String, Task>, path: &mut Vec<String>, out: &mut Vec<TaskPath>) {
        for (name, task) in tasks {
            path.push(name.clone());
            let ready = matches!(task.status, TaskStatus::Open | TaskStatus::Executing)
                && traverse::all_completed(&task.tasks);
            if ready {
                out.push(path.clone());
            } else {
                inner(&task.tasks, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    inner(tasks, &mut Vec::new(), &mut out);
    out
}

fn instance_snapshot(instance: &WorkflowInstance) -> Value {
    serde_json::to_value(instance).unwrap_or_else(|e| {
        warn!(error = %e, "failed to snapshot instance for reference resolution");
        Value::Null
    })
}

/// Resolve references and evaluate the gates, moving the task to executing.
fn prepare_task(task: &mut Task, root: &Value) -> PreparedAction {
    crate::reference::resolve_task(task, root);
    task.status = TaskStatus::Executing;
    task.time_started = Some(Utc::now());

    if truthy_opt(&task.error_if) {
        PreparedAction::GateError
    } else if truthy_opt(&task.skip_if) || task.handler.is_none() {
        PreparedAction::Skip
    } else {
        PreparedAction::Dispatch
    }
}

fn fail_task(task: &mut Task, message: String) {
    task.status = TaskStatus::Error;
    task.error_msg = Some(message);
}

/// An errorIf gate that fired. Honors `ignoreError` like a handler error.
fn apply_gate_error(task: &mut Task) -> bool {
    if task.ignore_error {
        task.mark_completed(false);
        false
    } else {
        fail_task(task, "errorIf condition met".to_string());
        true
    }
}

/// Fold a handler completion report back into the task. Returns true when
/// the task failed hard.
fn apply_outcome(task: &mut Task, outcome: handlers::Result<()>) -> bool {
    task.handler_executed = true;
    match outcome {
        Ok(()) => {
            if task.status == TaskStatus::Paused {
                if let Some(started) = task.time_started {
                    task.handler_duration = Some((Utc::now() - started).num_milliseconds());
                }
                debug!("task paused by handler");
            } else {
                task.mark_completed(true);
            }
            false
        }
        Err(err) => {
            // A handler that failed to load never ran.
            if matches!(err, handlers::HandlerError::NotFound(_)) {
                task.handler_executed = false;
            }
            if task.ignore_error {
                warn!(error = %err, "handler error ignored");
                task.status = TaskStatus::Executing;
                task.error_msg = None;
                task.mark_completed(task.handler_executed);
                false
            } else {
                fail_task(task, err.to_string());
                true
            }
        }
    }
}

async fn invoke(
    registry: &Arc<HandlerRegistry>,
    workflow_id: &str,
    task_name: &str,
    task: &mut Task,
) -> handlers::Result<()> {
    let Some(id) = task.handler.clone() else {
        return Ok(());
    };
    let handler = registry.resolve(&id)?;
    handler.handle(workflow_id, task_name, task).await
}

/// Run one task outside the batch machinery (the pre/post workflow hooks
/// follow the same dispatch rules as a leaf task). Returns true when the
/// task failed hard.
pub(crate) async fn run_single(
    registry: &Arc<HandlerRegistry>,
    workflow_id: &str,
    task_name: &str,
    task: &mut Task,
    root: &Value,
) -> bool {
    if task.status == TaskStatus::Completed {
        return false;
    }
    if task.time_opened.is_none() {
        task.status = TaskStatus::Open;
        task.time_opened = Some(Utc::now());
    }

    match prepare_task(task, root) {
        PreparedAction::GateError => apply_gate_error(task),
        PreparedAction::Skip => {
            task.mark_completed(false);
            false
        }
        PreparedAction::Dispatch => {
            let outcome = invoke(registry, workflow_id, task_name, task).await;
            apply_outcome(task, outcome)
        }
    }
}
