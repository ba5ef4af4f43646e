//! Core sktrack types.
//!
//! These types validate their input at construction time, so a URL or
//! origin that made it into the client is known to be usable.

mod api_url;
mod cookie_scope;
pub mod endpoint;

pub use api_url::{ApiUrl, DEVELOPMENT_API_URL, Environment, PRODUCTION_API_URL};
pub use cookie_scope::{AppOrigin, COOKIE_PATH, CookieScope, PRODUCTION_HOST, compute_cookie_domain};
pub use endpoint::{Collection, is_issuance_endpoint};
