//! Local registry of installed content items

use crate::document;
use malt_errors::Error;
use malt_types::{CatalogItem, InventoryEntry, ItemKind};
use std::path::{Path, PathBuf};

/// Registry of installed tools or courses, keyed by item name
///
/// Backed by one JSON document per item kind. The batch installer clears and
/// repopulates it; upserts are keyed by name so re-running an install
/// converges instead of duplicating entries.
#[derive(Debug, Clone)]
pub struct Registry {
    kind: ItemKind,
    path: PathBuf,
}

impl Registry {
    #[must_use]
    pub fn open(state_dir: &Path, kind: ItemKind) -> Self {
        Self {
            kind,
            path: state_dir.join(format!("{}.json", kind.dir_name())),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// All registered items
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document exists but cannot be read.
    pub async fn all(&self) -> Result<Vec<CatalogItem>, Error> {
        Ok(document::read_json(&self.path).await?.unwrap_or_default())
    }

    /// Look up one item by name
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document cannot be read.
    pub async fn get(&self, name: &str) -> Result<Option<CatalogItem>, Error> {
        Ok(self.all().await?.into_iter().find(|item| item.name == name))
    }

    /// The `{name, version}` inventory posted to the update service
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document cannot be read.
    pub async fn inventory(&self) -> Result<Vec<InventoryEntry>, Error> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|item| InventoryEntry {
                name: item.name,
                version: item.version,
            })
            .collect())
    }

    /// Remove every entry. The installer rebuilds the registry from the
    /// remote catalog; there is no incremental diff.
    ///
    /// # Errors
    ///
    /// Returns an error if the empty document cannot be written.
    pub async fn clear(&self) -> Result<(), Error> {
        document::write_json::<Vec<CatalogItem>>(&self.path, &Vec::new()).await
    }

    /// Insert or replace the entry with the item's name
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document cannot be read or written.
    pub async fn upsert(&self, item: CatalogItem) -> Result<(), Error> {
        let mut items = self.all().await?;
        match items.iter_mut().find(|existing| existing.name == item.name) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        document::write_json(&self.path, &items).await
    }
}
