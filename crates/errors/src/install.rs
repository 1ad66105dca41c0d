//! Content-installer error types

use crate::codes::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum InstallError {
    /// The remote catalog could not be fetched or decoded.
    #[error("catalog fetch failed: {message}")]
    CatalogFetch { message: String },

    /// The catalog answered with a non-zero business code.
    #[error("catalog rejected the request (code {code})")]
    CatalogRejected { code: i32 },

    /// The catalog returned no items at all.
    #[error("catalog contains no items")]
    EmptyCatalog,

    /// A single item's download or verification failed.
    #[error("item {name} download failed: {message}")]
    ItemDownload { name: String, message: String },

    /// Icon/index discovery or registry write failed after extraction.
    #[error("item {name} post-processing failed: {message}")]
    PostProcess { name: String, message: String },
}

impl InstallError {
    #[must_use]
    pub fn wire_code(&self) -> ErrorCode {
        ErrorCode::ToolDownloadFail
    }
}
