//! Wire frames pushed over the progress channel

use crate::Stage;
use malt_errors::ErrorCode;
use serde::{Deserialize, Serialize};

/// Stage/percent snapshot for one named operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressState {
    pub stage: Stage,
    /// Item name on batch installs; absent on the single-asset upgrade path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Percent complete within the stage, monotonically non-decreasing
    pub progress: i32,
}

/// One JSON frame on the progress channel
///
/// `{code:0, state:{...}}` for progress, `{code, message}` for a terminal
/// error. Exactly one error frame ends a failed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Frame {
    Progress { code: i32, state: ProgressState },
    Error { code: i32, message: String },
}

impl Frame {
    /// Build a progress frame (`code` is always 0)
    #[must_use]
    pub fn progress(stage: Stage, name: Option<String>, progress: i32) -> Self {
        Frame::Progress {
            code: 0,
            state: ProgressState {
                stage,
                name,
                progress,
            },
        }
    }

    /// Build a terminal error frame from the wire code table
    #[must_use]
    pub fn error(code: ErrorCode) -> Self {
        Frame::Error {
            code: code.as_i32(),
            message: code.message().to_string(),
        }
    }

    /// Whether this frame ends the operation (DONE, REBOOT or an error)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Frame::Progress { state, .. } => {
                matches!(state.stage, Stage::Done | Stage::Reboot)
            }
            Frame::Error { .. } => true,
        }
    }
}
