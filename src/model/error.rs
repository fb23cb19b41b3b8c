// ABOUTME: Error types for the workflow data model
// ABOUTME: Covers validation failures and definition parsing errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
