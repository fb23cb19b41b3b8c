// ABOUTME: Main library module for the trellis workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod api;
pub mod cli;
pub mod engine;
pub mod handlers;
pub mod logging;
pub mod model;
pub mod reference;
pub mod store;

// Re-export commonly used types
pub use api::Workflows;
pub use engine::{EngineError, ExecutionDriver, Scheduler};
pub use handlers::{HandlerRegistry, TaskHandler};
pub use model::{InstanceStatus, Task, TaskStatus, WorkflowDefinition, WorkflowInstance};
pub use store::{InstanceQuery, StoreConfig, StoreKind, WorkflowStore};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
