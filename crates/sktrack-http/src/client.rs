//! The authenticated request client.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, trace, warn};

use sktrack_core::error::ApiError;
use sktrack_core::traits::TokenStore;
use sktrack_core::types::endpoint::TOKEN_VERIFY;
use sktrack_core::AccessToken;

use crate::config::ClientConfig;
use crate::normalize::{status_error, transport_error};
use crate::redact::SanitizedHeaders;
use crate::refresh::{RefreshError, RefreshState, TokenRefresher};
use crate::request::{ApiRequest, ApiResponse, MultipartForm, RequestBody};

/// HTTP client for the sktrack backend.
///
/// Every request goes through [`send`](Self::send): the stored access token
/// is attached, network failures on safe methods are retried with backoff,
/// a 401 from a protected endpoint triggers at most one silent refresh and
/// re-issue, and every failure comes back as an [`ApiError`].
///
/// The client never navigates or touches session state; a request whose
/// session can't be recovered fails with
/// [`ErrorKind::SessionExpired`](sktrack_core::ErrorKind::SessionExpired).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    store: Arc<dyn TokenStore>,
    refresher: Arc<TokenRefresher>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client. The base URL in `config` is fixed for its lifetime.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sktrack/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        let refresher = Arc::new(TokenRefresher::new(&config, Arc::clone(&store)));

        Self {
            http,
            config: Arc::new(config),
            store,
            refresher,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The token store this client reads tokens from.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Send a request.
    ///
    /// # Errors
    ///
    /// Any failure, normalized. A 401 that survives the refresh cycle is
    /// reported as a session-expired error.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let stored = self.store.access_token();
        let sent_with = if request.prepare(stored.as_ref()) {
            stored
        } else {
            None
        };

        match self.dispatch(&request).await {
            Err(err) if err.http_status() == Some(401) && request.refreshable() => {
                debug!(state = %RefreshState::AwaitingRefresh, "Got 401, attempting silent refresh");
                self.retry_after_refresh(request, sent_with.as_ref()).await
            }
            other => other,
        }
    }

    async fn retry_after_refresh(
        &self,
        mut request: ApiRequest,
        stale: Option<&AccessToken>,
    ) -> Result<ApiResponse, ApiError> {
        let fresh = self
            .refresher
            .refresh(stale)
            .await
            .map_err(|e| ApiError::session_expired().with_source(e))?;

        request.retried = true;
        request.set_bearer(&fresh);
        debug!(state = %RefreshState::RetryingOriginal, "Re-issuing request with refreshed token");

        match self.dispatch(&request).await {
            Err(err) if err.http_status() == Some(401) => {
                warn!(state = %RefreshState::Failed, "Request still unauthorized after refresh");
                Err(ApiError::session_expired().with_source(err))
            }
            other => other,
        }
    }

    /// One logical attempt, repeated on network failures per the retry policy.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let policy = self.config.retry;
        let mut attempt = 0;
        loop {
            match self.execute(request).await {
                Err(err) if policy.should_retry(&request.method, attempt, &err) => {
                    let delay = policy.delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Network failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()),
        };

        if self.config.debug_logging {
            debug!(
                method = %request.method,
                %url,
                headers = ?SanitizedHeaders(&request.headers),
                "API request"
            );
        }

        let response = builder.send().await.map_err(|e| {
            let err = transport_error(e);
            if self.config.debug_logging {
                debug!(%url, error = %err, "API request failed");
            }
            err
        })?;

        let status = response.status();
        if self.config.debug_logging {
            debug!(status = status.as_u16(), %url, "API response");
        } else {
            trace!(status = status.as_u16(), "API response");
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    /// Absolute URLs pass through; paths are joined onto the base URL.
    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            self.config.api_url.endpoint(path)
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)).await?.json()
    }

    /// PATCH a JSON body and decode the JSON response.
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::patch(path).json(body)).await?.json()
    }

    /// PUT a JSON body and decode the JSON response.
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).json(body)).await?.json()
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// POST a multipart form and decode the JSON response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).multipart(form)).await?.json()
    }

    /// Ask the backend whether `token` is still valid.
    #[instrument(skip_all)]
    pub async fn verify_token(&self, token: &AccessToken) -> Result<(), ApiError> {
        let request = ApiRequest::post(TOKEN_VERIFY).json(json!({ "token": token.as_str() }));
        self.send(request).await.map(|_| ())
    }

    /// Run one refresh through the same coalescing refresher requests use.
    ///
    /// `stale` is the access token known to be rejected, if any.
    pub async fn refresh_access_token(
        &self,
        stale: Option<&AccessToken>,
    ) -> Result<AccessToken, RefreshError> {
        self.refresher.refresh(stale).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sktrack_core::error::StorageError;
    use sktrack_core::types::ApiUrl;
    use sktrack_core::{RefreshToken, TokenPair};

    struct NoTokens;

    impl TokenStore for NoTokens {
        fn set_tokens(&self, _pair: &TokenPair) -> Result<(), StorageError> {
            Ok(())
        }
        fn access_token(&self) -> Option<AccessToken> {
            None
        }
        fn refresh_token(&self) -> Option<RefreshToken> {
            None
        }
        fn remove_tokens(&self) {}
    }

    fn client() -> ApiClient {
        let api = ApiUrl::new("https://api.example.com/").unwrap();
        ApiClient::new(ClientConfig::new(api), Arc::new(NoTokens))
    }

    #[test]
    fn joins_paths_onto_base() {
        let client = client();
        assert_eq!(
            client.url_for("/api/orders/"),
            "https://api.example.com/api/orders/"
        );
        assert_eq!(
            client.url_for("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn debug_output_has_no_store_contents() {
        let out = format!("{:?}", client());
        assert!(out.contains("api.example.com"));
    }
}
