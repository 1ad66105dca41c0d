//! Archive extraction error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// The file's sniffed format is not the one the operation expects.
    #[error("format mismatch: expected {expected}, detected {detected}")]
    FormatMismatch { expected: String, detected: String },

    /// The file matches none of the supported formats.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// I/O failure mid-unpack. The destination directory must be treated as
    /// contaminated by the caller.
    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },
}
