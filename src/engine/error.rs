// ABOUTME: Error types for the execution engine
// ABOUTME: Validation, already-completed, and store failures surface here

use thiserror::Error;

use crate::model::ModelError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ModelError),

    #[error("Workflow instance already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
