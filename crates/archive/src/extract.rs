//! Archive unpacking

use crate::format::{sniff, ArchiveFormat};
use flate2::read::GzDecoder;
use malt_errors::{ArchiveError, Error};
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Archive as TarArchive;
use tokio::task;

/// Unpack `archive_path` into `dest_dir`, which is created if absent.
///
/// The file's sniffed format must match `expected`; entries escaping the
/// destination are skipped. Partial extraction is not rolled back — on error
/// the caller must treat `dest_dir` as contaminated.
///
/// # Errors
///
/// Returns `FormatMismatch` when the sniffed format differs from `expected`,
/// `UnsupportedFormat` when the file matches no known format, and
/// `ExtractionFailed` on any I/O failure mid-unpack.
pub async fn extract(
    archive_path: &Path,
    dest_dir: &Path,
    expected: ArchiveFormat,
) -> Result<(), Error> {
    let detected = sniff(archive_path).await?;
    if detected != expected {
        return Err(ArchiveError::FormatMismatch {
            expected: expected.name().to_string(),
            detected: detected.name().to_string(),
        }
        .into());
    }

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ArchiveError::ExtractionFailed {
            message: format!("failed to create destination directory: {e}"),
        })?;

    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    tracing::debug!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        format = %expected,
        "extracting archive"
    );

    match expected {
        ArchiveFormat::Tar => extract_tar(archive_path, dest_dir, false).await,
        ArchiveFormat::TarGz => extract_tar(archive_path, dest_dir, true).await,
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir).await,
    }
}

/// Extract a tarball, optionally gzip-compressed
async fn extract_tar(archive_path: PathBuf, dest_dir: PathBuf, gzipped: bool) -> Result<(), Error> {
    task::spawn_blocking(move || -> Result<(), Error> {
        let file = File::open(&archive_path).map_err(|e| ArchiveError::ExtractionFailed {
            message: format!("failed to open archive: {e}"),
        })?;

        let unpack_result = if gzipped {
            TarArchive::new(GzDecoder::new(file)).unpack(&dest_dir)
        } else {
            TarArchive::new(file).unpack(&dest_dir)
        };

        unpack_result.map_err(|e| ArchiveError::ExtractionFailed {
            message: format!("failed to extract tar: {e}"),
        })?;

        Ok(())
    })
    .await
    .map_err(|e| ArchiveError::ExtractionFailed {
        message: format!("task join error: {e}"),
    })?
}

/// Extract a zip archive
async fn extract_zip(archive_path: PathBuf, dest_dir: PathBuf) -> Result<(), Error> {
    task::spawn_blocking(move || -> Result<(), Error> {
        let file = File::open(&archive_path).map_err(|e| ArchiveError::ExtractionFailed {
            message: format!("failed to open archive: {e}"),
        })?;

        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| ArchiveError::ExtractionFailed {
                message: format!("failed to read zip archive: {e}"),
            })?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ArchiveError::ExtractionFailed {
                    message: format!("failed to read zip entry: {e}"),
                })?;

            // enclosed_name rejects entries escaping the destination
            let outpath = match entry.enclosed_name() {
                Some(path) => dest_dir.join(path),
                None => continue,
            };

            if entry.name().ends_with('/') {
                std::fs::create_dir_all(&outpath).map_err(|e| {
                    ArchiveError::ExtractionFailed {
                        message: format!("failed to create directory: {e}"),
                    }
                })?;
            } else {
                if let Some(parent) = outpath.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            ArchiveError::ExtractionFailed {
                                message: format!("failed to create parent directory: {e}"),
                            }
                        })?;
                    }
                }
                let mut outfile =
                    File::create(&outpath).map_err(|e| ArchiveError::ExtractionFailed {
                        message: format!("failed to create file: {e}"),
                    })?;
                std::io::copy(&mut entry, &mut outfile).map_err(|e| {
                    ArchiveError::ExtractionFailed {
                        message: format!("failed to extract file: {e}"),
                    }
                })?;
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
                }
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| ArchiveError::ExtractionFailed {
        message: format!("task join error: {e}"),
    })?
}
