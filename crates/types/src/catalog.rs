//! Remote catalog records for installable content (tools and courses)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two kinds of installable content bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Tool,
    Course,
}

impl ItemKind {
    /// Directory segment under `asset/` holding bundles of this kind
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            ItemKind::Tool => "tools",
            ItemKind::Course => "courses",
        }
    }

    /// File name of a downloaded bundle of this kind
    #[must_use]
    pub fn bundle_name(self) -> &'static str {
        match self {
            ItemKind::Tool => "tool.tar",
            ItemKind::Course => "course.tar",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One installable content item as described by the remote catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub version: String,
    pub download_url: String,
    /// SHA-256 hex digest of the bundle, when the catalog publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// App-root-relative path to the item's entry page, filled in after
    /// extraction
    #[serde(default)]
    pub relpath: String,
    /// App-root-relative path to the item's icon, filled in after extraction
    #[serde(default)]
    pub icon: String,
    /// Licensing flag as reported by the catalog
    #[serde(default)]
    pub purchased: bool,
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(rename = "createTime", default = "Utc::now")]
    pub create_time: DateTime<Utc>,
}

/// Catalog listing response: `{code, tools: [...]}` or `{code, courses: [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    pub code: i32,
    #[serde(alias = "tools", alias = "courses", default)]
    pub items: Vec<CatalogItem>,
}

/// `{name, version}` pair describing one locally registered item, sent to the
/// update service when asking whether newer content exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub version: String,
}

/// Update service verdict on a posted inventory
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVerdict {
    pub code: i32,
    #[serde(default)]
    pub newver: bool,
    #[serde(alias = "tools", alias = "courses", default)]
    pub items: Vec<CatalogItem>,
}
