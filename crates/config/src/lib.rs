#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration for the Malt upgrade and content-installer subsystem
//!
//! Loaded from a TOML file with hard-coded defaults for every field, so a
//! missing or partial file always yields a usable configuration.

use malt_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// Remote service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// `POST {key, serial}` → `{code, token}`
    #[serde(default)]
    pub login_url: String,
    /// `POST {os, version}` with bearer token → `{code, upgrade}`
    #[serde(default)]
    pub check_url: String,
    /// Object-store login used to authorize asset downloads
    #[serde(default)]
    pub netdisk_login_url: String,
    /// Tool catalog listing
    #[serde(default)]
    pub tool_mall_url: String,
    /// Course catalog listing
    #[serde(default)]
    pub course_mall_url: String,
    /// Tool inventory check endpoint
    #[serde(default)]
    pub tools_update_url: String,
    /// Course inventory check endpoint
    #[serde(default)]
    pub courses_update_url: String,
    /// When true the content bucket is public: downloads carry no auth
    /// header and no object-store login is performed.
    #[serde(default)]
    pub public_bucket: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            login_url: String::new(),
            check_url: String::new(),
            netdisk_login_url: String::new(),
            tool_mall_url: String::new(),
            course_mall_url: String::new(),
            tools_update_url: String::new(),
            courses_update_url: String::new(),
            public_bucket: false,
        }
    }
}

/// Filesystem layout, all relative to `app_root` unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    /// Unpacked front-end files, removed before an upgrade lands new ones
    #[serde(default = "default_web_dir")]
    pub web_dir: PathBuf,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    #[serde(default = "default_product_file")]
    pub product_file: PathBuf,
    /// The supervisor executable spawned on reboot
    #[serde(default = "default_helper_path")]
    pub helper_path: PathBuf,
    /// The server executable: renamed aside during backup, relaunched by
    /// the supervisor after a reboot
    #[serde(default = "default_server_binary")]
    pub server_binary: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            app_root: default_app_root(),
            temp_dir: default_temp_dir(),
            asset_dir: default_asset_dir(),
            web_dir: default_web_dir(),
            state_dir: default_state_dir(),
            pid_file: default_pid_file(),
            product_file: default_product_file(),
            helper_path: default_helper_path(),
            server_binary: default_server_binary(),
        }
    }
}

impl PathConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_root.join(path)
        }
    }

    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.resolve(&self.temp_dir)
    }

    #[must_use]
    pub fn asset_dir(&self) -> PathBuf {
        self.resolve(&self.asset_dir)
    }

    #[must_use]
    pub fn web_dir(&self) -> PathBuf {
        self.resolve(&self.web_dir)
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.state_dir)
    }

    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.resolve(&self.pid_file)
    }

    #[must_use]
    pub fn product_file(&self) -> PathBuf {
        self.resolve(&self.product_file)
    }

    #[must_use]
    pub fn helper_path(&self) -> PathBuf {
        self.resolve(&self.helper_path)
    }

    #[must_use]
    pub fn server_binary(&self) -> PathBuf {
        self.resolve(&self.server_binary)
    }
}

/// Where configuration and achievement data are copied before an upgrade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_conf")]
    pub conf_dir: PathBuf,
    #[serde(default = "default_backup_medal")]
    pub medal_dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            conf_dir: default_backup_conf(),
            medal_dir: default_backup_medal(),
        }
    }
}

/// Network tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base delay between retries in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_app_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_temp_dir() -> PathBuf {
    PathBuf::from("tmp")
}
fn default_asset_dir() -> PathBuf {
    PathBuf::from("asset")
}
fn default_web_dir() -> PathBuf {
    PathBuf::from("web")
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_pid_file() -> PathBuf {
    PathBuf::from("pid.tmp")
}
fn default_product_file() -> PathBuf {
    PathBuf::from("conf/product.json")
}
fn default_helper_path() -> PathBuf {
    PathBuf::from("bin/upgrade-helper")
}
fn default_server_binary() -> PathBuf {
    PathBuf::from("bin/malt-server")
}
fn default_backup_conf() -> PathBuf {
    PathBuf::from("backup/conf")
}
fn default_backup_medal() -> PathBuf {
    PathBuf::from("backup/medal")
}
fn default_timeout() -> u64 {
    300
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    ///
    /// # Errors
    ///
    /// Returns an error only when the file exists but cannot be parsed.
    pub async fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path).await
        } else {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/malt.toml"))
            .await
            .unwrap();
        assert!(!config.service.public_bucket);
        assert_eq!(config.network.retries, 3);
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("malt.toml");
        tokio::fs::write(
            &path,
            r#"
[service]
check_url = "https://updates.example.com/check"
public_bucket = true

[network]
retries = 1
"#,
        )
        .await
        .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.service.check_url, "https://updates.example.com/check");
        assert!(config.service.public_bucket);
        assert_eq!(config.network.retries, 1);
        assert_eq!(config.network.timeout, 300);
        assert_eq!(config.paths.pid_file, PathBuf::from("pid.tmp"));
    }

    #[tokio::test]
    async fn relative_paths_resolve_against_app_root() {
        let mut config = Config::default();
        config.paths.app_root = PathBuf::from("/opt/malt");
        assert_eq!(config.paths.temp_dir(), PathBuf::from("/opt/malt/tmp"));
        assert_eq!(config.paths.pid_file(), PathBuf::from("/opt/malt/pid.tmp"));

        config.paths.temp_dir = PathBuf::from("/var/tmp/malt");
        assert_eq!(config.paths.temp_dir(), PathBuf::from("/var/tmp/malt"));
    }
}
