//! Staged extraction and live-tree swap
//!
//! The archive is unpacked into a fresh staging directory and validated
//! there; only then are its top-level entries renamed into the live root.
//! Renames are atomic per entry on the same filesystem, so a crash can no
//! longer leave a half-extracted live tree the way in-place unpacking could.

use malt_errors::{Error, UpgradeError};
use std::path::Path;
use tokio::fs;

/// Swap a fully staged tree into the live root.
///
/// For every top-level entry of `staging`: an existing entry of the same
/// name in `live_root` is renamed aside to `<name>.old`, then the staged
/// entry is renamed into place.
///
/// # Errors
///
/// Returns `StagingIncomplete` when the staging directory is empty (an
/// extraction that produced nothing is never swapped in), or an I/O error
/// if a rename fails.
pub async fn apply_staged(staging: &Path, live_root: &Path) -> Result<(), Error> {
    let mut entries = fs::read_dir(staging)
        .await
        .map_err(|e| Error::io_with_path(&e, staging))?;

    let mut staged = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, staging))?
    {
        staged.push(entry);
    }

    if staged.is_empty() {
        return Err(UpgradeError::StagingIncomplete {
            message: "staging directory is empty".to_string(),
        }
        .into());
    }

    fs::create_dir_all(live_root)
        .await
        .map_err(|e| Error::io_with_path(&e, live_root))?;

    for entry in staged {
        let name = entry.file_name();
        let dest = live_root.join(&name);

        if fs::try_exists(&dest)
            .await
            .map_err(|e| Error::io_with_path(&e, &dest))?
        {
            let mut aside_name = name.clone();
            aside_name.push(".old");
            let aside = live_root.join(&aside_name);
            if fs::try_exists(&aside)
                .await
                .map_err(|e| Error::io_with_path(&e, &aside))?
            {
                remove_any(&aside).await?;
            }
            fs::rename(&dest, &aside)
                .await
                .map_err(|e| Error::io_with_path(&e, &dest))?;
        }

        fs::rename(entry.path(), &dest)
            .await
            .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        tracing::debug!(entry = %dest.display(), "swapped in staged entry");
    }

    Ok(())
}

async fn remove_any(path: &Path) -> Result<(), Error> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
    } else {
        fs::remove_file(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
    }
    Ok(())
}
