//! Remote catalog and inventory-check requests

use malt_errors::{Error, InstallError};
use malt_net::NetClient;
use malt_types::{CatalogItem, CatalogResponse, InventoryEntry, ItemKind, UpdateVerdict};

/// Fetch the full item list for one catalog
///
/// # Errors
///
/// Returns `CatalogFetch` when the catalog is unreachable or undecodable and
/// `CatalogRejected` when it answers with a non-zero business code.
pub async fn fetch_catalog(
    client: &NetClient,
    url: &str,
    key: &str,
    serial: &str,
) -> Result<Vec<CatalogItem>, Error> {
    let response: CatalogResponse = malt_net::fetch_json(
        client,
        url,
        &[("productKey", key), ("productSerial", serial)],
    )
    .await
    .map_err(|e| InstallError::CatalogFetch {
        message: e.to_string(),
    })?;

    if response.code != 0 {
        return Err(InstallError::CatalogRejected {
            code: response.code,
        }
        .into());
    }
    Ok(response.items)
}

/// Post the locally registered `{name, version}` inventory and return the
/// service's verdict. No downloads happen here; a `newver: false` verdict
/// means the local content is current.
///
/// # Errors
///
/// Returns `CatalogFetch` when the service is unreachable or undecodable and
/// `CatalogRejected` on a non-zero business code.
pub async fn check_updates(
    client: &NetClient,
    url: &str,
    key: &str,
    serial: &str,
    kind: ItemKind,
    inventory: &[InventoryEntry],
) -> Result<UpdateVerdict, Error> {
    let mut body = serde_json::Map::new();
    body.insert("key".to_string(), serde_json::Value::String(key.to_string()));
    body.insert(
        "serial".to_string(),
        serde_json::Value::String(serial.to_string()),
    );
    body.insert(kind.dir_name().to_string(), serde_json::to_value(inventory)?);
    let body = serde_json::Value::Object(body);

    let response = client
        .post_json(url, &body, None)
        .await
        .map_err(|e| InstallError::CatalogFetch {
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(InstallError::CatalogFetch {
            message: format!("status {}", response.status()),
        }
        .into());
    }

    let verdict: UpdateVerdict =
        response
            .json()
            .await
            .map_err(|e| InstallError::CatalogFetch {
                message: e.to_string(),
            })?;

    if verdict.code != 0 {
        return Err(InstallError::CatalogRejected {
            code: verdict.code,
        }
        .into());
    }
    Ok(verdict)
}
