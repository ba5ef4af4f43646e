//! sktrack-http - Authenticated HTTP client and session controller.
//!
//! [`ApiClient`] attaches the stored access token to every request and
//! silently refreshes it once when a protected endpoint answers 401.
//! [`AuthController`] sits on top of it and owns the user's session.

mod client;
mod config;
mod controller;
mod endpoints;
mod normalize;
mod redact;
mod refresh;
mod request;
mod resources;

pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT, RetryPolicy};
pub use controller::{
    AuthController, DASHBOARD_ROUTE, LOGIN_ROUTE, Navigation, RouteDecision, SessionStatus,
    is_public_route,
};
pub use refresh::{RefreshError, RefreshState, TokenRefresher};
pub use request::{ApiRequest, ApiResponse, FormPart, MultipartForm, RequestBody};
