//! Login, registration, logout, session validation and route guarding.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use sktrack_core::error::{ApiError, AuthError, Error};
use sktrack_core::types::endpoint::{REGISTER, TOKEN_PAIR};
use sktrack_core::{Credentials, Registration, Result, Session, TokenPair};

use crate::client::ApiClient;
use crate::endpoints::PairResponse;
use crate::request::ApiRequest;

/// Where to send the user after a login.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Where unauthenticated users are sent.
pub const LOGIN_ROUTE: &str = "/login";

/// Routes that never require a session. Matched on whole path segments.
const PUBLIC_PREFIXES: [&str; 4] = ["/login", "/register", "/password-reset", "/logout"];

/// Public pages that are matched exactly.
const PUBLIC_EXACT: [&str; 2] = ["/", "/dashboard/skeleton"];

/// Returns true if `route` can be viewed without a session.
///
/// The root only matches itself, so `/dashboard` is not public just
/// because every path starts with `/`.
pub fn is_public_route(route: &str) -> bool {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    PUBLIC_EXACT.contains(&path)
        || PUBLIC_PREFIXES.iter().any(|prefix| {
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
}

/// A navigation the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    To(String),
}

/// Outcome of passive session validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The route is public; nothing was checked.
    Skipped,
    Authenticated,
    Unauthenticated,
    /// Tokens are stored but the backend could not be reached to check them.
    Unverified,
}

/// What the route guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// A validation is in flight; render a loading state.
    Pending,
    RedirectToLogin,
}

#[derive(Debug, Default)]
struct State {
    session: Session,
    deep_link: Option<String>,
}

#[derive(Debug)]
struct Inner {
    client: ApiClient,
    state: RwLock<State>,
}

/// Owns the in-memory [`Session`] and decides navigation.
///
/// Cheap to clone; clones share the same session.
#[derive(Debug, Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

/// Clears the loading flag when dropped, whichever way an operation ends.
struct LoadingGuard<'a> {
    state: &'a RwLock<State>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        write(self.state).session.set_loading(false);
    }
}

fn write(state: &RwLock<State>) -> RwLockWriteGuard<'_, State> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

impl AuthController {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                state: RwLock::new(State::default()),
            }),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// A snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Remember a protected route to return to after the next login.
    pub fn remember_deep_link(&self, route: impl Into<String>) {
        write(&self.inner.state).deep_link = Some(route.into());
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        write(&self.inner.state).session.set_loading(true);
        LoadingGuard {
            state: &self.inner.state,
        }
    }

    /// Exchange credentials for a token pair and start a session.
    ///
    /// # Errors
    ///
    /// An [`AuthError`] whose message can be shown to the user. Nothing is
    /// persisted unless the backend returned both tokens.
    #[instrument(skip_all, fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Navigation> {
        let _loading = self.begin_loading();

        let request = ApiRequest::post(TOKEN_PAIR).json(json!({
            "email": credentials.email(),
            "password": credentials.password(),
        }));
        let response = self
            .inner
            .client
            .send(request)
            .await
            .map_err(classify_login_error)?;

        let body: PairResponse = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(e.message().to_string()))?;
        let pair = TokenPair::from_parts(body.access, body.refresh).ok_or_else(|| {
            AuthError::MalformedResponse("response is missing the access or refresh token".into())
        })?;

        self.inner
            .client
            .store()
            .set_tokens(&pair)
            .map_err(|source| AuthError::NotPersisted { source })?;

        let target = {
            let mut state = write(&self.inner.state);
            state.session.authenticate(pair);
            state.deep_link.take()
        };

        info!("Logged in");
        Ok(Navigation::To(
            target.unwrap_or_else(|| DASHBOARD_ROUTE.to_string()),
        ))
    }

    /// Create an account, then send the user to the login page.
    ///
    /// No session is started and the stored tokens are left alone.
    ///
    /// # Errors
    ///
    /// An [`AuthError`] classified like a failed login, except that a 401
    /// is a plain rejection.
    #[instrument(skip_all, fields(email = %registration.email()))]
    pub async fn register(&self, registration: &Registration) -> Result<Navigation> {
        let _loading = self.begin_loading();

        let request = ApiRequest::post(REGISTER).json(json!({
            "email": registration.email(),
            "password": registration.password(),
            "confirm_password": registration.confirm_password(),
        }));
        let response = self
            .inner
            .client
            .send(request)
            .await
            .map_err(classify_rejection)?;

        if let Ok(body) = response.json::<serde_json::Value>()
            && let Some(message) = body.get("message").and_then(|m| m.as_str())
        {
            debug!(response = message, "Registration accepted");
        }

        info!("Registered");
        Ok(Navigation::To(LOGIN_ROUTE.to_string()))
    }

    /// End the session locally. The backend is not told; the tokens simply
    /// stop being sent.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Navigation {
        self.inner.client.store().remove_tokens();
        {
            let mut state = write(&self.inner.state);
            state.session.clear();
            state.deep_link = None;
        }
        info!("Logged out");
        Navigation::To(LOGIN_ROUTE.to_string())
    }

    /// Check the stored tokens for `route`.
    ///
    /// Public routes are skipped. Otherwise the access token is verified
    /// and, if the backend rejects it, refreshed once. A backend that can't
    /// be reached leaves the stored session in place as
    /// [`SessionStatus::Unverified`].
    #[instrument(skip(self))]
    pub async fn validate(&self, route: &str) -> SessionStatus {
        if is_public_route(route) {
            return SessionStatus::Skipped;
        }

        let _loading = self.begin_loading();
        let client = &self.inner.client;

        let Some(pair) = client.store().token_pair() else {
            debug!("No stored tokens");
            write(&self.inner.state).session.clear();
            return SessionStatus::Unauthenticated;
        };

        match client.verify_token(pair.access()).await {
            Ok(()) => {
                write(&self.inner.state).session.authenticate(pair);
                SessionStatus::Authenticated
            }
            Err(err) if err.code().is_network() => {
                warn!(error = %err, "Could not verify session, keeping stored tokens");
                write(&self.inner.state).session.authenticate(pair);
                SessionStatus::Unverified
            }
            Err(err) => {
                debug!(error = %err, "Access token rejected, refreshing");
                match client.refresh_access_token(Some(pair.access())).await {
                    Ok(access) => {
                        let (_, refresh) = pair.into_parts();
                        write(&self.inner.state)
                            .session
                            .authenticate(TokenPair::new(access, refresh));
                        SessionStatus::Authenticated
                    }
                    Err(e) => {
                        info!(error = %e, "Session could not be refreshed");
                        write(&self.inner.state).session.clear();
                        SessionStatus::Unauthenticated
                    }
                }
            }
        }
    }

    /// Decide whether `route` may be shown right now.
    ///
    /// Protected routes seen without a session are remembered and replayed
    /// by the next login.
    pub fn guard(&self, route: &str) -> RouteDecision {
        if is_public_route(route) {
            return RouteDecision::Allow;
        }

        let mut state = write(&self.inner.state);
        if state.session.loading() {
            RouteDecision::Pending
        } else if state.session.is_authenticated() {
            RouteDecision::Allow
        } else {
            state.deep_link = Some(route.to_string());
            RouteDecision::RedirectToLogin
        }
    }

    /// Apply the navigation policy to an error surfaced while on
    /// `current_route`.
    ///
    /// An expired session is cleared and, on a protected route, sends the
    /// user to the login page. Every other error is left to the caller.
    pub fn handle_error(&self, err: &Error, current_route: &str) -> Navigation {
        if !err.is_session_expired() {
            return Navigation::Stay;
        }

        self.inner.client.store().remove_tokens();
        let mut state = write(&self.inner.state);
        state.session.clear();

        if is_public_route(current_route) {
            Navigation::Stay
        } else {
            state.deep_link = Some(current_route.to_string());
            Navigation::To(LOGIN_ROUTE.to_string())
        }
    }
}

/// Map a token-pairing failure to something a user can act on.
fn classify_login_error(err: ApiError) -> AuthError {
    if err.http_status() == Some(401) {
        return AuthError::InvalidCredentials;
    }
    classify_rejection(err)
}

/// Unreachable backend, field validation, or a plain rejection.
fn classify_rejection(err: ApiError) -> AuthError {
    if err.code().is_network() {
        return AuthError::Unreachable { source: err };
    }

    match err.http_status() {
        Some(400) => {
            let fields = err.field_errors();
            if fields.iter().any(|(field, _)| field != "detail" && field != "message") {
                AuthError::Validation(fields)
            } else {
                AuthError::Rejected {
                    status: Some(400),
                    message: err.message().to_string(),
                }
            }
        }
        status => AuthError::Rejected {
            status,
            message: err.message().to_string(),
        },
    }
}
