//! The upgrade state machine

use crate::{apply_staged, auth::AuthSession, backup_before_extract, service::UpdateClient};
use malt_archive::ArchiveFormat;
use malt_config::Config;
use malt_errors::{Error, UpgradeError};
use malt_events::{Reporter, Stage};
use malt_hash::Hash;
use malt_net::{netdisk_token, NetClient, NetConfig, TransferPool, TransferRequest};
use malt_state::{write_pid, AccountStore};
use malt_types::UpgradeSummary;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;

/// Polling interval for single-asset download progress frames
const DOWNLOAD_TICK: Duration = Duration::from_millis(50);

/// Sequences the whole-application upgrade end-to-end
///
/// One orchestrator owns the account record and its login session; it is the
/// single writer of the pending-upgrade descriptor.
pub struct UpgradeOrchestrator {
    config: Config,
    client: NetClient,
    service: UpdateClient,
    accounts: AccountStore,
    auth: AuthSession,
}

impl UpgradeOrchestrator {
    /// Create an orchestrator over the given configuration and account store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: Config, accounts: AccountStore) -> Result<Self, Error> {
        let client = NetClient::new(NetConfig::from(&config.network))?;
        let service = UpdateClient::new(
            client.clone(),
            config.service.login_url.clone(),
            config.service.check_url.clone(),
        );
        Ok(Self {
            config,
            client,
            service,
            accounts,
            auth: AuthSession::new(),
        })
    }

    /// Ask the update service whether a newer version exists.
    ///
    /// On a hit the descriptor is persisted to the account record and the
    /// user-facing summary returned; `None` means this installation is
    /// current and nothing was touched.
    ///
    /// # Errors
    ///
    /// Returns `LoginToken` when authentication fails and `CheckFailed` when
    /// the service is unreachable or rejects the request. The account record
    /// is left untouched on every error path.
    pub async fn check(&mut self) -> Result<Option<UpgradeSummary>, Error> {
        let account = self.accounts.load().await?;
        let token = self
            .auth
            .token(&self.service, &account.key, &account.serial)
            .await?;

        let upgrade = self
            .service
            .check(&token, &account.os, &account.version)
            .await?;

        match upgrade {
            None => {
                tracing::info!(version = %account.version, "no update available");
                Ok(None)
            }
            Some(upgrade) => {
                self.accounts.set_upgrade_info(&upgrade).await?;
                tracing::info!(version = %upgrade.version, "update found and recorded");
                Ok(Some(upgrade.summary()))
            }
        }
    }

    /// Download, verify, back up, extract and swap in the pending upgrade,
    /// streaming DOWNLOAD/UNCOMPRESSION/DONE frames to `reporter`.
    ///
    /// The pending flag stays raised afterwards; `confirm_reboot` clears it
    /// once the restart is acknowledged.
    ///
    /// # Errors
    ///
    /// Any stage failure pushes exactly one terminal `{code, message}` frame
    /// and aborts the remaining stages. `AlreadyLatest` is the informational
    /// stop when no upgrade is pending.
    pub async fn launch<R: Reporter>(&mut self, reporter: &R) -> Result<(), Error> {
        match self.run_upgrade(reporter).await {
            Ok(()) => Ok(()),
            Err(err) => {
                reporter.push_error(err.wire_code());
                Err(err)
            }
        }
    }

    async fn run_upgrade<R: Reporter>(&mut self, reporter: &R) -> Result<(), Error> {
        let account = self.accounts.load().await?;

        // Guard against a stale trigger: the flag may already be cleared.
        if !account.newver {
            return Err(UpgradeError::AlreadyLatest.into());
        }
        let upgrade = account.upgrade.ok_or(UpgradeError::MissingDescriptor)?;
        let expected = Hash::from_hex(&upgrade.asset.hash)?;

        let format = ArchiveFormat::for_upgrade_asset();
        let temp_dir = self.config.paths.temp_dir();
        fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &temp_dir))?;

        // Timestamp-qualified so runs never collide on the archive path.
        let archive_path = temp_dir.join(format!(
            "{}.{}",
            chrono::Utc::now().timestamp(),
            format.extension()
        ));

        let bearer = if self.config.service.public_bucket {
            None
        } else {
            let token = netdisk_token(
                &self.client,
                &self.config.service.netdisk_login_url,
                &account.key,
                &account.serial,
            )
            .await
            .map_err(|e| UpgradeError::LoginToken {
                message: e.to_string(),
            })?;
            Some(token)
        };

        tracing::info!(source = %upgrade.asset.source, dest = %archive_path.display(), "downloading upgrade asset");

        let pool = TransferPool::new(self.client.clone(), 1);
        let handle = pool
            .start(vec![TransferRequest {
                tag: upgrade.name.clone(),
                url: upgrade.asset.source.clone(),
                dest: archive_path.clone(),
                bearer,
                expected_hash: Some(expected),
            }])
            .pop()
            .ok_or_else(|| Error::internal("transfer pool returned no handle"))?;

        let mut ticker = tokio::time::interval(DOWNLOAD_TICK);
        loop {
            ticker.tick().await;
            let snapshot = handle.snapshot();
            if snapshot.completed {
                break;
            }
            reporter.push_progress(Stage::Download, None, snapshot.percent());
        }

        if let Err(err) = handle.join().await {
            let _ = fs::remove_file(&archive_path).await;
            return Err(err);
        }
        reporter.push_progress(Stage::Download, None, 100);

        backup_before_extract(&self.config.paths, &self.config.backup).await?;

        reporter.push_progress(Stage::Uncompression, None, 0);

        let staging = temp_dir.join(format!("staging-{}", uuid::Uuid::new_v4()));
        if let Err(err) = malt_archive::extract(&archive_path, &staging, format).await {
            let _ = fs::remove_file(&archive_path).await;
            let _ = fs::remove_dir_all(&staging).await;
            return Err(err);
        }

        apply_staged(&staging, &self.config.paths.app_root).await?;
        let _ = fs::remove_dir_all(&staging).await;

        reporter.push_progress(Stage::Uncompression, None, 100);
        reporter.push_progress(Stage::Done, None, 100);

        tracing::info!(version = %upgrade.version, "upgrade applied, awaiting reboot");
        Ok(())
    }

    /// Acknowledge the restart: clear the pending flag and advance the
    /// recorded version to the applied descriptor's.
    ///
    /// # Errors
    ///
    /// Returns an error if the account record cannot be read or written.
    pub async fn confirm_reboot(&self) -> Result<(), Error> {
        let account = self.accounts.load().await?;
        match account.upgrade {
            Some(upgrade) => self.accounts.set_reboot_info(&upgrade.version).await,
            None => Ok(()),
        }
    }

    /// Hand off to the external supervisor: persist this process's pid and
    /// spawn `upgrade-helper <server-binary>` fire-and-forget. The server
    /// expects to be killed shortly after.
    ///
    /// # Errors
    ///
    /// Returns `RebootFailed` when the pid file cannot be written or the
    /// supervisor cannot be spawned; a terminal error frame is pushed.
    pub async fn reboot<R: Reporter>(&self, reporter: &R) -> Result<(), Error> {
        match self.run_reboot(reporter).await {
            Ok(()) => Ok(()),
            Err(err) => {
                reporter.push_error(err.wire_code());
                Err(err)
            }
        }
    }

    async fn run_reboot<R: Reporter>(&self, reporter: &R) -> Result<(), Error> {
        let pid_file = self.config.paths.pid_file();
        write_pid(&pid_file, std::process::id())
            .await
            .map_err(|e| UpgradeError::RebootFailed {
                message: e.to_string(),
            })?;

        let helper = self.config.paths.helper_path();
        let server = self.config.paths.server_binary();

        tracing::info!(helper = %helper.display(), server = %server.display(), "spawning supervisor");

        std::process::Command::new(&helper)
            .arg(&server)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| UpgradeError::RebootFailed {
                message: e.to_string(),
            })?;

        reporter.push_progress(Stage::Reboot, None, 100);
        Ok(())
    }
}
