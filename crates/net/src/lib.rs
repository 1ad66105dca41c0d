#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for the Malt upgrade and installer pipeline
//!
//! This crate owns all HTTP traffic: the retrying client, single-file
//! downloads with inline digest verification, and the transfer engine that
//! fans a batch of downloads out across concurrent tasks while exposing
//! per-item progress snapshots.

mod client;
mod download;
mod transfer;

pub use client::{NetClient, NetConfig};
pub use download::{Download, DownloadResult};
pub use transfer::{TransferHandle, TransferPool, TransferRequest, TransferSnapshot};

use malt_errors::{Error, NetworkError};
use serde::de::DeserializeOwned;
use url::Url;

/// Fetch and decode a JSON document
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with a non-2xx
/// status, or the body cannot be decoded as `T`.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &NetClient,
    url: &str,
    headers: &[(&str, &str)],
) -> Result<T, Error> {
    let response = client.get_with_headers(url, headers).await?;

    if !response.status().is_success() {
        return Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into());
    }

    response
        .json()
        .await
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()).into())
}

/// Log in to the object store fronting asset downloads and return the
/// bearer token carried in the response body.
///
/// # Errors
///
/// Returns an error if the request fails, the store answers non-2xx, or the
/// body is empty.
pub async fn netdisk_token(
    client: &NetClient,
    login_url: &str,
    key: &str,
    serial: &str,
) -> Result<String, Error> {
    let body = serde_json::json!({ "key": key, "serial": serial });
    let response = client.post_json(login_url, &body, None).await?;

    if !response.status().is_success() {
        return Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into());
    }

    let token = response
        .text()
        .await
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()))?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(NetworkError::DownloadFailed("empty object-store token".to_string()).into());
    }
    Ok(token)
}

/// Check if a URL is accessible
///
/// # Errors
///
/// Returns an error only on internal failures; inaccessible URLs yield
/// `Ok(false)`.
pub async fn check_url(client: &NetClient, url: &str) -> Result<bool, Error> {
    match client.head(url).await {
        Ok(response) => Ok(response.status().is_success()),
        Err(_) => Ok(false),
    }
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://example.com").is_ok());
        assert!(parse_url("not a url").is_err());
    }
}
