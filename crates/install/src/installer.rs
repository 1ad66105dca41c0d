//! The batch content installer

use crate::{catalog, find_icon, find_index};
use malt_archive::ArchiveFormat;
use malt_config::Config;
use malt_errors::{Error, ErrorCode, InstallError};
use malt_events::{Reporter, Stage};
use malt_hash::Hash;
use malt_net::{netdisk_token, NetClient, NetConfig, TransferHandle, TransferPool, TransferRequest};
use malt_state::Registry;
use malt_types::{CatalogItem, ItemKind, UpdateVerdict};
use std::path::PathBuf;
use std::time::Duration;

/// Polling interval for batch download progress frames
const BATCH_TICK: Duration = Duration::from_millis(200);

/// Installs one kind of content bundle (tools or courses) from the remote
/// catalog into the local asset tree and registry
pub struct ContentInstaller {
    config: Config,
    client: NetClient,
    registry: Registry,
}

impl ContentInstaller {
    /// Create an installer for the registry's item kind
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: Config, registry: Registry) -> Result<Self, Error> {
        let client = NetClient::new(NetConfig::from(&config.network))?;
        Ok(Self {
            config,
            client,
            registry,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.registry.kind()
    }

    fn mall_url(&self) -> &str {
        match self.kind() {
            ItemKind::Tool => &self.config.service.tool_mall_url,
            ItemKind::Course => &self.config.service.course_mall_url,
        }
    }

    fn update_url(&self) -> &str {
        match self.kind() {
            ItemKind::Tool => &self.config.service.tools_update_url,
            ItemKind::Course => &self.config.service.courses_update_url,
        }
    }

    fn download_fail_code(&self) -> ErrorCode {
        match self.kind() {
            ItemKind::Tool => ErrorCode::ToolDownloadFail,
            ItemKind::Course => ErrorCode::CourseDownloadFail,
        }
    }

    fn item_dir(&self, name: &str) -> PathBuf {
        self.config
            .paths
            .asset_dir()
            .join(self.kind().dir_name())
            .join(name)
    }

    /// Post the registered inventory to the update service and return its
    /// verdict. A `newver: false` verdict means nothing to install; no
    /// download occurs either way.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry cannot be read or the service call
    /// fails.
    pub async fn check_updates(&self, key: &str, serial: &str) -> Result<UpdateVerdict, Error> {
        let inventory = self.registry.inventory().await?;
        catalog::check_updates(
            &self.client,
            self.update_url(),
            key,
            serial,
            self.kind(),
            &inventory,
        )
        .await
    }

    /// Run the full install: fetch the catalog, clear the registry, download
    /// every purchased item, extract and register each as it completes.
    /// Returns the number of items installed.
    ///
    /// # Errors
    ///
    /// The first failing item aborts the whole call; exactly one terminal
    /// error frame is pushed. Partially extracted items are not rolled back.
    pub async fn install<R: Reporter>(
        &self,
        key: &str,
        serial: &str,
        reporter: &R,
    ) -> Result<usize, Error> {
        match self.run_install(key, serial, reporter).await {
            Ok(count) => {
                reporter.push_progress(Stage::Done, None, 100);
                tracing::info!(kind = %self.kind(), count, "content install complete");
                Ok(count)
            }
            Err(err) => {
                reporter.push_error(self.download_fail_code());
                Err(err)
            }
        }
    }

    async fn run_install<R: Reporter>(
        &self,
        key: &str,
        serial: &str,
        reporter: &R,
    ) -> Result<usize, Error> {
        let items = catalog::fetch_catalog(&self.client, self.mall_url(), key, serial).await?;
        if items.is_empty() {
            return Err(InstallError::EmptyCatalog.into());
        }

        // Destructive by design: the registry is rebuilt from the catalog.
        self.registry.clear().await?;

        let purchased: Vec<CatalogItem> =
            items.into_iter().filter(|item| item.purchased).collect();

        // Public buckets already front extracted content; register straight
        // from catalog metadata without a fetch step.
        if self.config.service.public_bucket {
            let mut count = 0;
            for item in purchased {
                self.registry.upsert(item).await?;
                count += 1;
            }
            return Ok(count);
        }

        let bearer = netdisk_token(
            &self.client,
            &self.config.service.netdisk_login_url,
            key,
            serial,
        )
        .await?;

        let mut requests = Vec::with_capacity(purchased.len());
        for item in &purchased {
            let expected_hash = match &item.hash {
                Some(hex) => Some(Hash::from_hex(hex).map_err(|e| InstallError::ItemDownload {
                    name: item.name.clone(),
                    message: e.to_string(),
                })?),
                None => None,
            };
            requests.push(TransferRequest {
                tag: item.name.clone(),
                url: item.download_url.clone(),
                dest: self.item_dir(&item.name).join(self.kind().bundle_name()),
                bearer: Some(bearer.clone()),
                expected_hash,
            });
        }

        let pool = TransferPool::new(self.client.clone(), 0);
        let handles = pool.start(requests);

        let total = handles.len();
        let mut slots: Vec<Option<(TransferHandle, CatalogItem)>> = handles
            .into_iter()
            .zip(purchased.into_iter())
            .map(Some)
            .collect();

        let mut completed = 0;
        let mut ticker = tokio::time::interval(BATCH_TICK);
        while completed < total {
            ticker.tick().await;

            for slot in &mut slots {
                let finished = match slot {
                    Some((handle, _)) => {
                        let snapshot = handle.snapshot();
                        if snapshot.completed {
                            if snapshot.failed.is_none() {
                                reporter.push_progress(Stage::Download, Some(snapshot.tag), 100);
                            }
                            true
                        } else {
                            reporter.push_progress(
                                Stage::Download,
                                Some(snapshot.tag.clone()),
                                snapshot.percent(),
                            );
                            false
                        }
                    }
                    None => false,
                };

                if !finished {
                    continue;
                }
                if let Some((handle, item)) = slot.take() {
                    if let Err(err) = handle.join().await {
                        return Err(InstallError::ItemDownload {
                            name: item.name,
                            message: err.to_string(),
                        }
                        .into());
                    }
                    self.finish_item(&item, reporter).await?;
                    completed += 1;
                }
            }
        }

        Ok(completed)
    }

    /// Extract a completed bundle, discover its icon and entry page, and
    /// upsert it into the registry
    async fn finish_item<R: Reporter>(
        &self,
        item: &CatalogItem,
        reporter: &R,
    ) -> Result<(), Error> {
        let item_dir = self.item_dir(&item.name);
        let bundle = item_dir.join(self.kind().bundle_name());

        reporter.push_progress(Stage::Uncompression, Some(item.name.clone()), 0);

        malt_archive::extract(&bundle, &item_dir, ArchiveFormat::Tar)
            .await
            .map_err(|e| InstallError::PostProcess {
                name: item.name.clone(),
                message: e.to_string(),
            })?;

        tokio::fs::remove_file(&bundle)
            .await
            .map_err(|e| InstallError::PostProcess {
                name: item.name.clone(),
                message: format!("could not remove bundle: {e}"),
            })?;

        let mut registered = item.clone();
        if let Some(icon) = find_icon(&item_dir, self.kind(), &item.name) {
            registered.icon = icon;
        }
        if let Some(relpath) = find_index(&item_dir, &self.config.paths.app_root) {
            registered.relpath = relpath;
        }
        self.registry.upsert(registered).await?;

        reporter.push_progress(Stage::Uncompression, Some(item.name.clone()), 100);
        Ok(())
    }
}
