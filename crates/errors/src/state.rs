//! Durable-state error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("{what} has not been initialized")]
    NotInitialized { what: String },

    #[error("corrupted state document: {message}")]
    Corrupted { message: String },

    #[error("failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },

    #[error("invalid pid file: {message}")]
    PidFileInvalid { message: String },
}
