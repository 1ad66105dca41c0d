//! The product account document

use crate::document;
use chrono::Utc;
use malt_errors::{Error, StateError};
use malt_types::{Account, ProductDescriptor, Upgrade};
use std::path::{Path, PathBuf};
use tokio::fs;

const ACCOUNT_FILE: &str = "account.json";

/// Single-writer store for the product account record
///
/// The upgrade orchestrator owns all mutations; other components only read.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    #[must_use]
    pub fn open(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(ACCOUNT_FILE),
        }
    }

    /// Load the account record
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` when no record has been created yet, or
    /// `Corrupted` when the document cannot be decoded.
    pub async fn load(&self) -> Result<Account, Error> {
        document::read_json(&self.path)
            .await?
            .ok_or_else(|| {
                StateError::NotInitialized {
                    what: "product account".to_string(),
                }
                .into()
            })
    }

    /// Persist the full account record
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn save(&self, account: &Account) -> Result<(), Error> {
        document::write_json(&self.path, account).await
    }

    /// Create the account record from the product descriptor file if it does
    /// not exist yet, then return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor file is missing or malformed, or
    /// the record cannot be persisted.
    pub async fn init_from_descriptor(&self, product_file: &Path) -> Result<Account, Error> {
        if let Some(existing) = document::read_json::<Account>(&self.path).await? {
            return Ok(existing);
        }

        let bytes = fs::read(product_file)
            .await
            .map_err(|e| Error::io_with_path(&e, product_file))?;
        let descriptor: ProductDescriptor =
            serde_json::from_slice(&bytes).map_err(|e| StateError::Corrupted {
                message: format!("{}: {e}", product_file.display()),
            })?;

        let account = Account::from_descriptor(descriptor, Utc::now());
        self.save(&account).await?;
        tracing::info!(name = %account.name, version = %account.version, "account record created");
        Ok(account)
    }

    /// Record a pending upgrade found by a check: descriptor stored, new
    /// version flag raised.
    ///
    /// # Errors
    ///
    /// Returns an error if no account exists or the write fails.
    pub async fn set_upgrade_info(&self, upgrade: &Upgrade) -> Result<(), Error> {
        let mut account = self.load().await?;
        account.newver = true;
        account.upgrade = Some(upgrade.clone());
        self.save(&account).await
    }

    /// Confirm an applied upgrade after reboot: flag cleared, version
    /// advanced, creation time refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if no account exists or the write fails.
    pub async fn set_reboot_info(&self, version: &str) -> Result<(), Error> {
        let mut account = self.load().await?;
        account.newver = false;
        account.version = version.to_string();
        account.create_time = Utc::now();
        self.save(&account).await
    }
}
