#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Batch installer for content packages (tools and courses)
//!
//! Fetches the remote catalog, clears the local registry for the item kind,
//! fans the purchased items' downloads out through the transfer engine, and
//! extracts + registers each bundle as its transfer completes. One item's
//! failure aborts the whole call; re-running converges because registry
//! upserts are keyed by item name.

mod catalog;
mod installer;
mod postprocess;

pub use catalog::{check_updates, fetch_catalog};
pub use installer::ContentInstaller;
pub use postprocess::{find_icon, find_index};
