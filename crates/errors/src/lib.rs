#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the Malt upgrade and content-installer subsystem
//!
//! This crate provides fine-grained error types organized by domain,
//! plus the fixed wire error-code table used by the progress channel.

use thiserror::Error;

pub mod archive;
pub mod codes;
pub mod config;
pub mod install;
pub mod network;
pub mod state;
pub mod upgrade;

// Re-export all error types at the root
pub use archive::ArchiveError;
pub use codes::ErrorCode;
pub use config::ConfigError;
pub use install::InstallError;
pub use network::NetworkError;
pub use state::StateError;
pub use upgrade::UpgradeError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("upgrade error: {0}")]
    Upgrade(#[from] UpgradeError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// The wire code reported for this error on the progress channel
    #[must_use]
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            Error::Network(_) => ErrorCode::UpgradeDownload,
            Error::Upgrade(err) => err.wire_code(),
            Error::Install(err) => err.wire_code(),
            Error::Archive(_) => ErrorCode::UpgradeFail,
            Error::State(_) | Error::Config(_) | Error::Internal(_) | Error::Io { .. } => {
                ErrorCode::UpgradeFail
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for subsystem operations
pub type Result<T> = std::result::Result<T, Error>;
