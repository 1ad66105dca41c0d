#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Durable state owned by the upgrade/installer subsystem
//!
//! Three small documents live under the state directory: the product account
//! record (with its pending-upgrade descriptor), one content registry per
//! item kind, and the pid file read by the external process supervisor. The
//! wider product's document database is a separate collaborator; nothing
//! here goes through it.

mod account;
mod document;
mod pidfile;
mod registry;

pub use account::AccountStore;
pub use pidfile::{read_pid, write_pid};
pub use registry::Registry;
