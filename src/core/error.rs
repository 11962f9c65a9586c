use crate::context::ContextStream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Missing context value '{key}' in {stream} stream")]
    MissingContext { stream: ContextStream, key: String },

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
