#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! The self-upgrade orchestrator
//!
//! Sequences authenticate → check-version → download → verify → backup →
//! extract → replace → signal-restart, streaming stage/percent frames to the
//! connected admin client at every step. The orchestrator never restarts the
//! server in-process: it stages the new tree, swaps it in, and leaves the
//! kill-old/start-new step to the external `upgrade-helper` supervisor.

mod apply;
mod auth;
mod backup;
mod orchestrator;
mod service;

pub use apply::apply_staged;
pub use auth::AuthSession;
pub use backup::backup_before_extract;
pub use orchestrator::UpgradeOrchestrator;
pub use service::UpdateClient;
