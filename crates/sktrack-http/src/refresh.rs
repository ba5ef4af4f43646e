//! Silent access-token refresh.
//!
//! A protected request that comes back 401 moves through
//! `Idle -> AwaitingRefresh -> RetryingOriginal | Failed`. The refresh call
//! itself goes through its own HTTP client that never intercepts, so a 401
//! from the refresh endpoint can not recurse.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use sktrack_core::error::ApiError;
use sktrack_core::traits::TokenStore;
use sktrack_core::types::ApiUrl;
use sktrack_core::types::endpoint::TOKEN_REFRESH;
use sktrack_core::{AccessToken, TokenPair};

use crate::config::ClientConfig;
use crate::endpoints::RefreshResponse;
use crate::normalize::{status_error, transport_error};

/// Where a request is in the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    AwaitingRefresh,
    RetryingOriginal,
    Failed,
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshState::Idle => "idle",
            RefreshState::AwaitingRefresh => "awaiting-refresh",
            RefreshState::RetryingOriginal => "retrying-original",
            RefreshState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a refresh did not produce a new access token.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh rejected: {0}")]
    Rejected(#[source] ApiError),

    #[error("refresh endpoint unreachable: {0}")]
    Network(#[source] ApiError),

    #[error("refresh response has no access token")]
    Malformed,
}

/// Exchanges the stored refresh token for a new access token.
///
/// Concurrent callers are serialized. A caller whose request used an access
/// token that has since been replaced takes the replacement instead of
/// refreshing again.
pub struct TokenRefresher {
    http: reqwest::Client,
    api_url: ApiUrl,
    store: Arc<dyn TokenStore>,
    gate: Mutex<()>,
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TokenRefresher {
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sktrack/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            api_url: config.api_url.clone(),
            store,
            gate: Mutex::new(()),
        }
    }

    /// Get a fresh access token.
    ///
    /// `stale` is the token the failed request carried. On failure the
    /// stored tokens are removed; a refresh that can't succeed means the
    /// session is over.
    #[instrument(skip_all)]
    pub async fn refresh(&self, stale: Option<&AccessToken>) -> Result<AccessToken, RefreshError> {
        let _turn = self.gate.lock().await;

        if let Some(current) = self.store.access_token()
            && stale.is_some_and(|s| s != &current)
        {
            debug!("Access token already refreshed by another request");
            return Ok(current);
        }

        debug!(state = %RefreshState::AwaitingRefresh, "Refreshing access token");
        match self.exchange().await {
            Ok(access) => Ok(access),
            Err(e) => {
                warn!(state = %RefreshState::Failed, error = %e, "Token refresh failed, clearing session");
                self.store.remove_tokens();
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<AccessToken, RefreshError> {
        let refresh = self
            .store
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let url = self.api_url.endpoint(TOKEN_REFRESH);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "refresh": refresh.as_str() }))
            .send()
            .await
            .map_err(|e| RefreshError::Network(transport_error(e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RefreshError::Network(transport_error(e)))?;

        if !status.is_success() {
            return Err(RefreshError::Rejected(status_error(status, &body)));
        }

        let parsed: RefreshResponse =
            serde_json::from_slice(&body).map_err(|_| RefreshError::Malformed)?;
        let access = parsed
            .access
            .filter(|a| !a.is_empty())
            .map(AccessToken::new)
            .ok_or(RefreshError::Malformed)?;

        // The backend does not rotate refresh tokens.
        let pair = TokenPair::new(access.clone(), refresh);
        if let Err(e) = self.store.set_tokens(&pair) {
            warn!(error = %e, "Could not persist refreshed access token, continuing with it");
        }

        Ok(access)
    }
}
