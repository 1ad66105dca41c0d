//! Cached authentication against the update service
//!
//! The bearer token is owned by the orchestrator instance rather than shared
//! process-wide, so concurrent checks cannot race on hidden state. The token
//! is validated before every use; a stale or missing token triggers exactly
//! one re-login.

use crate::service::UpdateClient;
use chrono::{DateTime, Duration, Utc};
use malt_errors::Error;

/// How long a freshly issued token is trusted before re-login
const TOKEN_TTL_MINUTES: i64 = 60;

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Per-orchestrator login session with expiry-checked token reuse
pub struct AuthSession {
    cached: Option<CachedToken>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    #[must_use]
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Return a valid bearer token, reusing the cached one when it has not
    /// expired and logging in again otherwise.
    ///
    /// # Errors
    ///
    /// Returns `LoginToken` when re-login fails.
    pub async fn token(
        &mut self,
        service: &UpdateClient,
        key: &str,
        serial: &str,
    ) -> Result<String, Error> {
        if let Some(cached) = &self.cached {
            if !cached.value.is_empty() && Utc::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
            tracing::debug!("cached update-service token expired");
        }

        let token = service.login(key, serial).await?;
        self.cached = Some(CachedToken {
            value: token.clone(),
            expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES),
        });
        Ok(token)
    }

    /// Drop the cached token, forcing the next use to re-login
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
