#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Progress-channel events for the Malt upgrade and installer pipeline
//!
//! The admin/installer UI keeps a duplex connection open for the duration of
//! an upgrade or content install; the server pushes one JSON frame per state
//! transition and per polling tick. Delivery is best-effort: a dropped or
//! broken receiver never aborts the underlying operation.

mod frame;
mod stage;

pub use frame::{Frame, ProgressState};
pub use stage::Stage;

use tokio::sync::mpsc::UnboundedSender;

/// Sender half of a progress channel
pub type ReportSender = UnboundedSender<Frame>;

/// Receiver half of a progress channel
pub type ReportReceiver = tokio::sync::mpsc::UnboundedReceiver<Frame>;

/// Create a new progress channel
#[must_use]
pub fn channel() -> (ReportSender, ReportReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for pushing progress frames
///
/// Implemented by the raw `ReportSender` and by any struct carrying one.
/// Sends never fail from the caller's perspective; if the receiver is gone
/// the frame is dropped and the operation continues.
pub trait Reporter {
    /// Get the report sender for this reporter, if any
    fn report_sender(&self) -> Option<&ReportSender>;

    /// Push a frame through this reporter
    fn push(&self, frame: Frame) {
        if let Some(sender) = self.report_sender() {
            let _ = sender.send(frame);
        }
    }

    /// Push a stage/percent snapshot
    fn push_progress(&self, stage: Stage, name: Option<String>, progress: i32) {
        self.push(Frame::progress(stage, name, progress));
    }

    /// Push a terminal error frame for a wire code
    fn push_error(&self, code: malt_errors::ErrorCode) {
        self.push(Frame::error(code));
    }
}

impl Reporter for ReportSender {
    fn report_sender(&self) -> Option<&ReportSender> {
        Some(self)
    }
}

impl Reporter for Option<ReportSender> {
    fn report_sender(&self) -> Option<&ReportSender> {
        self.as_ref()
    }
}
