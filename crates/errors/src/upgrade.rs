//! Upgrade orchestration error types

use crate::codes::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpgradeError {
    /// Login against the remote update service did not yield a usable token.
    #[error("update service login failed: {message}")]
    LoginToken { message: String },

    /// The update service was unreachable or answered with a non-zero code.
    #[error("update check failed: {message}")]
    CheckFailed { message: String },

    /// The installation is already on the latest version. Informational stop,
    /// not a failure.
    #[error("already on the latest version")]
    AlreadyLatest,

    /// The account record carries no pending upgrade descriptor.
    #[error("no pending upgrade descriptor")]
    MissingDescriptor,

    /// The staged tree failed completeness validation before the swap.
    #[error("staged upgrade incomplete: {message}")]
    StagingIncomplete { message: String },

    #[error("reboot hand-off failed: {message}")]
    RebootFailed { message: String },
}

impl UpgradeError {
    #[must_use]
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            UpgradeError::LoginToken { .. } => ErrorCode::UpgradeLoginToken,
            UpgradeError::CheckFailed { .. } => ErrorCode::UpgradeCheckFail,
            UpgradeError::AlreadyLatest => ErrorCode::UpgradeDone,
            UpgradeError::MissingDescriptor | UpgradeError::StagingIncomplete { .. } => {
                ErrorCode::UpgradeFail
            }
            UpgradeError::RebootFailed { .. } => ErrorCode::UpgradeReboot,
        }
    }
}
