//! Single-file download with inline digest verification

use futures::StreamExt;
use malt_errors::{Error, NetworkError};
use malt_hash::{Hash, Hasher};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::NetClient;

/// Download operation handle
pub struct Download {
    url: Url,
    bearer: Option<String>,
}

/// Result of a completed download
#[derive(Debug)]
pub struct DownloadResult {
    pub url: String,
    pub size: u64,
    pub hash: Hash,
}

impl Download {
    /// Create a new download
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        Ok(Self { url, bearer: None })
    }

    /// Attach a bearer token sent as the `Authorization` header
    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Execute the download, streaming bytes to `<dest>.part` while the
    /// digest is computed, and renaming into place only once the digest has
    /// been checked against `expected_hash` (when given).
    ///
    /// `progress` is invoked per received chunk with (bytes so far, total).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers non-2xx,
    /// the file cannot be written, or the digest does not match. A mismatch
    /// removes the partial file before returning.
    pub async fn execute<F>(
        self,
        client: &NetClient,
        dest: &Path,
        expected_hash: Option<&Hash>,
        progress: F,
    ) -> Result<DownloadResult, Error>
    where
        F: Fn(u64, Option<u64>),
    {
        let url_str = self.url.to_string();

        let response = match &self.bearer {
            Some(token) => {
                let header = format!("Bearer {token}");
                client
                    .get_with_headers(url_str.as_str(), &[("Authorization", header.as_str())])
                    .await?
            }
            None => client.get(url_str.as_str()).await?,
        };

        if !response.status().is_success() {
            return Err(NetworkError::HttpError {
                status: response.status().as_u16(),
                message: response.status().to_string(),
            }
            .into());
        }

        let content_length = response.content_length();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }

        let temp_path = dest.with_extension("part");
        let mut file = File::create(&temp_path)
            .await
            .map_err(|e| Error::io_with_path(&e, &temp_path))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut hasher = Hasher::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(NetworkError::DownloadFailed(e.to_string()).into());
                }
            };

            hasher.update(&chunk);
            file.write_all(&chunk).await?;

            downloaded += chunk.len() as u64;
            progress(downloaded, content_length);
        }

        file.flush().await?;
        drop(file);

        let hash = hasher.finalize();

        if let Some(expected) = expected_hash {
            if hash != *expected {
                let _ = tokio::fs::remove_file(&temp_path).await;

                return Err(NetworkError::ChecksumMismatch {
                    expected: expected.to_hex(),
                    actual: hash.to_hex(),
                }
                .into());
            }
        }

        tokio::fs::rename(&temp_path, dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;

        tracing::debug!(url = %url_str, size = downloaded, "download complete");

        Ok(DownloadResult {
            url: url_str,
            size: downloaded,
            hash,
        })
    }
}
