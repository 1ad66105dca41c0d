//! Atomic JSON document persistence

use malt_errors::{Error, StateError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io_with_path(&e, path)),
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| StateError::Corrupted {
        message: format!("{}: {e}", path.display()),
    })?;
    Ok(Some(value))
}

/// Write through a sibling temp file and rename, so readers never observe a
/// half-written document.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let temp = path.with_extension("json.tmp");

    fs::write(&temp, &bytes)
        .await
        .map_err(|e| StateError::WriteFailed {
            path: temp.display().to_string(),
            message: e.to_string(),
        })?;
    fs::rename(&temp, path)
        .await
        .map_err(|e| StateError::WriteFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    Ok(())
}
