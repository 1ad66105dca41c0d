//! Pre-extraction backup of the live installation
//!
//! Everything here runs before the archive touches the live tree, so a
//! failed extraction always leaves a restorable copy of the configuration
//! and achievement data.

use malt_config::{BackupConfig, PathConfig};
use malt_errors::Error;
use std::path::{Path, PathBuf};
use tokio::task;

/// Suffix appended to the server binary when it is renamed aside
const OLD_SUFFIX: &str = "old";

/// Back up the live install before extraction:
/// - rename the server binary aside (`<name>old`); on some platforms the
///   running binary cannot be renamed, so failure here is logged and ignored
/// - copy `conf/` and the medal data directory to the configured backup dirs
/// - remove the stale unpacked web-asset directory
///
/// # Errors
///
/// Returns an error when a backup copy fails. Rename and web-dir removal
/// failures are non-fatal.
pub async fn backup_before_extract(paths: &PathConfig, backup: &BackupConfig) -> Result<(), Error> {
    let binary = paths.server_binary();
    if binary.exists() {
        let aside = old_name(&binary);
        if let Err(e) = tokio::fs::rename(&binary, &aside).await {
            tracing::warn!(binary = %binary.display(), error = %e, "could not rename server binary aside");
        }
    }

    let conf_src = paths.app_root.join("conf");
    if conf_src.exists() {
        let conf_dest = paths.resolve(&backup.conf_dir);
        copy_dir(conf_src, conf_dest).await?;
    }

    let medal_src = paths.asset_dir().join("medal");
    if medal_src.exists() {
        let medal_dest = paths.resolve(&backup.medal_dir);
        copy_dir(medal_src, medal_dest).await?;
    }

    let web_dir = paths.web_dir();
    if web_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&web_dir).await {
            tracing::warn!(dir = %web_dir.display(), error = %e, "could not remove stale web directory");
        }
    }

    Ok(())
}

fn old_name(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(
        || std::ffi::OsString::from(OLD_SUFFIX),
        std::ffi::OsStr::to_os_string,
    );
    name.push(OLD_SUFFIX);
    path.with_file_name(name)
}

/// Recursive directory copy, preserving the tree but not metadata
async fn copy_dir(src: PathBuf, dest: PathBuf) -> Result<(), Error> {
    task::spawn_blocking(move || -> Result<(), Error> { copy_dir_sync(&src, &dest) })
        .await
        .map_err(|e| Error::internal(format!("backup task failed: {e}")))?
}

fn copy_dir_sync(src: &Path, dest: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io_with_path(&e, dest))?;

    for entry in std::fs::read_dir(src).map_err(|e| Error::io_with_path(&e, src))? {
        let entry = entry.map_err(|e| Error::io_with_path(&e, src))?;
        let path = entry.path();
        let target = dest.join(entry.file_name());

        if path.is_dir() {
            copy_dir_sync(&path, &target)?;
        } else {
            std::fs::copy(&path, &target).map_err(|e| Error::io_with_path(&e, &path))?;
        }
    }
    Ok(())
}
