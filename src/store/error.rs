// ABOUTME: Error types for workflow persistence backends
// ABOUTME: Distinguishes not-found, capability, and backend I/O failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Instance has no id assigned")]
    MissingId,

    #[error("Operation not supported by the {backend} backend: {operation}")]
    Capability {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid store configuration: {0}")]
    Configuration(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
