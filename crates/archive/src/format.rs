//! Archive format sniffing

use malt_errors::{ArchiveError, Error};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

/// Supported archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Zip container (Windows application assets)
    Zip,
    /// Plain tarball (content bundles)
    Tar,
    /// Gzip-compressed tarball (Unix application assets)
    TarGz,
}

impl ArchiveFormat {
    /// The application-asset format for the platform this server runs on
    #[must_use]
    pub fn for_upgrade_asset() -> Self {
        if cfg!(windows) {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    /// File extension used when naming a downloaded asset of this format
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tgz",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const TAR_MAGIC: &[u8; 5] = b"ustar";
const TAR_MAGIC_OFFSET: u64 = 257;

/// Detect the archive format from file magic
///
/// # Errors
///
/// Returns `UnsupportedFormat` when the file matches none of the supported
/// formats, or an I/O error if it cannot be read.
pub async fn sniff(path: &Path) -> Result<ArchiveFormat, Error> {
    let mut file = File::open(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;

    let mut head = [0u8; 4];
    let read = read_up_to(&mut file, &mut head).await?;

    if read >= 4 && head == ZIP_MAGIC {
        return Ok(ArchiveFormat::Zip);
    }
    if read >= 2 && head[..2] == GZIP_MAGIC {
        return Ok(ArchiveFormat::TarGz);
    }

    // The ustar magic sits past the first header block.
    file.seek(SeekFrom::Start(TAR_MAGIC_OFFSET))
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    let mut magic = [0u8; 5];
    let read = read_up_to(&mut file, &mut magic).await?;
    if read == 5 && &magic == TAR_MAGIC {
        return Ok(ArchiveFormat::Tar);
    }

    Err(ArchiveError::UnsupportedFormat(path.display().to_string()).into())
}

async fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
