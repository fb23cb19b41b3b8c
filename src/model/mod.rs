// ABOUTME: Task tree data model for the trellis workflow engine
// ABOUTME: Exports instance and task structures, definitions, and traversal primitives

pub mod definition;
pub mod error;
pub mod instance;
pub mod traverse;

pub use definition::WorkflowDefinition;
pub use error::{ModelError, Result};
pub use instance::{truthy, truthy_opt, InstanceStatus, Task, TaskStatus, WorkflowInstance};
pub use traverse::{find_task_mut, task_at_path, task_at_path_mut, walk_tasks, TaskPath};
