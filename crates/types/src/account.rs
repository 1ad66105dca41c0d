//! The product account record and its pending-upgrade descriptor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies this installation and carries the pending upgrade descriptor.
///
/// Created once at install time. The upgrade descriptor is overwritten
/// whenever a check finds a new version, and cleared (flag reset, version
/// advanced) once a reboot confirms the upgrade applied. Single writer:
/// the upgrade orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Document discriminator, always `"account"`
    #[serde(default = "Account::metadata_value")]
    pub metadata: String,
    pub name: String,
    pub key: String,
    pub serial: String,
    pub os: String,
    pub version: String,
    #[serde(rename = "createTime")]
    pub create_time: DateTime<Utc>,
    /// Whether a check found a version newer than `version`
    #[serde(default)]
    pub newver: bool,
    pub upgrade: Option<Upgrade>,
}

impl Account {
    pub const METADATA: &'static str = "account";

    fn metadata_value() -> String {
        Self::METADATA.to_string()
    }

    /// Seed a fresh account record from the product descriptor file.
    #[must_use]
    pub fn from_descriptor(descriptor: ProductDescriptor, now: DateTime<Utc>) -> Self {
        Self {
            metadata: Self::metadata_value(),
            name: descriptor.name,
            key: descriptor.key,
            serial: descriptor.serial,
            os: descriptor.os,
            version: descriptor.version,
            create_time: now,
            newver: false,
            upgrade: None,
        }
    }
}

/// Upgrade descriptor returned by the update service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upgrade {
    pub name: String,
    pub version: String,
    pub asset: Asset,
    pub changelog: String,
    pub date: DateTime<Utc>,
}

impl Upgrade {
    /// The user-facing subset (no asset internals)
    #[must_use]
    pub fn summary(&self) -> UpgradeSummary {
        UpgradeSummary {
            name: self.name.clone(),
            version: self.version.clone(),
            changelog: self.changelog.clone(),
            date: self.date,
        }
    }
}

/// The downloadable artifact constituting a full application upgrade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub os: String,
    pub source: String,
    /// SHA-256 hex digest declared by the update service
    pub hash: String,
}

/// What the admin UI sees after a successful check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeSummary {
    pub name: String,
    pub version: String,
    pub changelog: String,
    pub date: DateTime<Utc>,
}

/// Local product descriptor file (`conf/product.json`), read at
/// startup/install time to identify this product installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub name: String,
    pub key: String,
    pub serial: String,
    pub os: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_round_trips_with_wire_names() {
        let json = r#"{
            "metadata": "account",
            "name": "malt",
            "key": "k-1",
            "serial": "AAAA-BBBB-CCCC-DDDD",
            "os": "linux",
            "version": "2.3.0",
            "createTime": "2024-05-01T00:00:00Z",
            "newver": true,
            "upgrade": {
                "name": "malt",
                "version": "2.4.0",
                "asset": {"os": "linux", "source": "https://example.com/a.tgz", "hash": "00"},
                "changelog": "fixes",
                "date": "2024-05-02T00:00:00Z"
            }
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert!(account.newver);
        assert_eq!(account.upgrade.as_ref().unwrap().version, "2.4.0");

        let back = serde_json::to_value(&account).unwrap();
        assert!(back.get("createTime").is_some());
    }
}
