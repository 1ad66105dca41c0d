#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core data types shared across the Malt upgrade and installer crates

pub mod account;
pub mod catalog;

pub use account::{Account, Asset, ProductDescriptor, Upgrade, UpgradeSummary};
pub use catalog::{CatalogItem, CatalogResponse, InventoryEntry, ItemKind, UpdateVerdict};
