//! Client for the remote update service

use malt_errors::{Error, UpgradeError};
use malt_net::NetClient;
use malt_types::Upgrade;
use serde::Deserialize;

/// Thin wrapper over the update service's login and check endpoints
#[derive(Clone)]
pub struct UpdateClient {
    client: NetClient,
    login_url: String,
    check_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    code: i32,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct CheckReply {
    code: i32,
    upgrade: Option<Upgrade>,
}

impl UpdateClient {
    #[must_use]
    pub fn new(client: NetClient, login_url: String, check_url: String) -> Self {
        Self {
            client,
            login_url,
            check_url,
        }
    }

    /// `POST {key, serial}` → bearer token
    ///
    /// # Errors
    ///
    /// Returns `LoginToken` when the service is unreachable, answers with a
    /// non-zero code, or returns an empty token.
    pub async fn login(&self, key: &str, serial: &str) -> Result<String, Error> {
        let body = serde_json::json!({ "key": key, "serial": serial });
        let reply: LoginReply = self
            .post(&self.login_url, &body, None)
            .await
            .map_err(|e| UpgradeError::LoginToken {
                message: e.to_string(),
            })?;

        if reply.code != 0 || reply.token.is_empty() {
            return Err(UpgradeError::LoginToken {
                message: format!("service answered code {}", reply.code),
            }
            .into());
        }
        Ok(reply.token)
    }

    /// `POST {os, version}` with bearer → pending upgrade descriptor, or
    /// `None` when this installation is current.
    ///
    /// # Errors
    ///
    /// Returns `CheckFailed` when the service is unreachable or answers with
    /// a non-zero code.
    pub async fn check(
        &self,
        token: &str,
        os: &str,
        version: &str,
    ) -> Result<Option<Upgrade>, Error> {
        let body = serde_json::json!({ "os": os, "version": version });
        let reply: CheckReply = self
            .post(&self.check_url, &body, Some(token))
            .await
            .map_err(|e| UpgradeError::CheckFailed {
                message: e.to_string(),
            })?;

        if reply.code != 0 {
            return Err(UpgradeError::CheckFailed {
                message: format!("service answered code {}", reply.code),
            }
            .into());
        }
        Ok(reply.upgrade)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<T, Error> {
        let response = self.client.post_json(url, body, bearer).await?;

        if !response.status().is_success() {
            return Err(malt_errors::NetworkError::HttpError {
                status: response.status().as_u16(),
                message: response.status().to_string(),
            }
            .into());
        }

        response
            .json()
            .await
            .map_err(|e| malt_errors::NetworkError::DownloadFailed(e.to_string()).into())
    }
}
