// ABOUTME: Handler invocation layer for the trellis workflow engine
// ABOUTME: Registry with deferred loading plus the built-in handler implementations

pub mod condition;
pub mod exec;
pub mod file;
pub mod log;
pub mod workflow;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::model::Task;
use crate::store::{StoreError, WorkflowStore};

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Handler not found: {0}")]
    NotFound(String),

    #[error("Invalid handler parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    Reported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, HandlerError>;

/// A pluggable unit that performs a task's side effect.
///
/// The returned `Result` is the completion report: `Ok` completes the task
/// unless the handler set its status to `paused`; `Err` marks it in error
/// unless `ignoreError` is set. Mutations to `task.parameters` are visible
/// to later reference resolutions.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, workflow_id: &str, task_name: &str, task: &mut Task) -> Result<()>;

    fn name(&self) -> &'static str;
}

type HandlerFactory = Box<dyn Fn() -> Arc<dyn TaskHandler> + Send + Sync>;

/// Resolves handler identifiers to handler instances.
///
/// Construction is deferred to first use and cached; an unknown identifier
/// surfaces as [`HandlerError::NotFound`], which the scheduler records as a
/// task error.
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
    loaded: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    /// Registry with all built-in handlers. The store is captured by the
    /// nested-workflow handler.
    pub fn with_builtins(store: Arc<dyn WorkflowStore>) -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
            loaded: RwLock::new(HashMap::new()),
        };

        registry.register("log", || Arc::new(log::LogHandler));
        registry.register("exec", || Arc::new(exec::ExecHandler));
        registry.register("file", || Arc::new(file::FileHandler));
        registry.register("condition", || Arc::new(condition::ConditionHandler));
        registry.register("test", || Arc::new(test::TestHandler));
        registry.register_factory(
            "workflow",
            Box::new(move || Arc::new(workflow::WorkflowHandler::new(store.clone()))),
        );

        registry
    }

    pub fn register(
        &mut self,
        id: &str,
        factory: impl Fn() -> Arc<dyn TaskHandler> + Send + Sync + 'static,
    ) {
        self.register_factory(id, Box::new(factory));
    }

    fn register_factory(&mut self, id: &str, factory: HandlerFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    /// Look up a handler by id, instantiating it on first use.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn TaskHandler>> {
        if let Some(handler) = self
            .loaded
            .read()
            .expect("handler cache poisoned")
            .get(id)
        {
            return Ok(handler.clone());
        }

        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        let handler = factory();

        self.loaded
            .write()
            .expect("handler cache poisoned")
            .insert(id.to_string(), handler.clone());
        Ok(handler)
    }

    pub fn handler_ids(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::with_builtins(Arc::new(FileStore::new("_unused")))
    }

    #[test]
    fn test_resolve_builtin() {
        let registry = registry();
        let handler = registry.resolve("log").unwrap();
        assert_eq!(handler.name(), "log");
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let registry = registry();
        let err = match registry.resolve("no-such-handler") {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, HandlerError::NotFound(_)));
        assert!(err.to_string().contains("no-such-handler"));
    }

    #[test]
    fn test_resolution_is_cached() {
        let registry = registry();
        let first = registry.resolve("test").unwrap();
        let second = registry.resolve("test").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
