//! Cookie scoping for the token cookies.
//!
//! Cookies are only removed by a deletion that carries the same `Domain`
//! and `Path` they were set with. [`compute_cookie_domain`] is the single
//! place the domain is derived, and [`CookieScope`] carries the result to
//! both the set and the remove path.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// Host of the production deployment. Cookies are pinned to it exactly.
pub const PRODUCTION_HOST: &str = "skdjangobackend-production.up.railway.app";

/// Shared hosting suffix; sibling apps under it must not share cookies.
const SHARED_HOSTING_SUFFIX: &str = "up.railway.app";

/// Path attribute used for every token cookie.
pub const COOKIE_PATH: &str = "/";

/// Compute the `Domain` attribute for a hostname.
///
/// - local and IP-literal hosts get no domain (host-only cookie)
/// - the production host and other shared-hosting hosts are used as-is
/// - any other host is widened to its last two labels, e.g.
///   `api.example.com` becomes `.example.com`
///
/// ```
/// use sktrack_core::compute_cookie_domain;
///
/// assert_eq!(compute_cookie_domain("localhost"), None);
/// assert_eq!(compute_cookie_domain("app.example.com").as_deref(), Some(".example.com"));
/// ```
pub fn compute_cookie_domain(hostname: &str) -> Option<String> {
    let host = hostname
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if host.is_empty() || host == "localhost" || host.ends_with(".localhost") {
        return None;
    }
    if host.parse::<IpAddr>().is_ok() {
        return None;
    }
    if host == PRODUCTION_HOST {
        return Some(host);
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    if host.ends_with(&format!(".{}", SHARED_HOSTING_SUFFIX)) {
        return Some(host);
    }

    Some(format!(".{}", labels[labels.len() - 2..].join(".")))
}

/// The origin the dashboard is served from.
///
/// Cookie attributes depend on it: the domain comes from its host, and
/// cookies are only marked `Secure` when it is served over HTTPS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppOrigin(Url);

impl AppOrigin {
    /// Parse an origin such as `https://dashboard.example.com`.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::AppOrigin {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(InvalidInputError::AppOrigin {
                value: s.to_string(),
                reason: "must be an http or https origin".to_string(),
            }
            .into());
        }
        if url.host_str().is_none() {
            return Err(InvalidInputError::AppOrigin {
                value: s.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(Self(url))
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// True when served over an encrypted transport.
    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// The scope token cookies for this origin are written with.
    pub fn cookie_scope(&self) -> CookieScope {
        CookieScope {
            domain: compute_cookie_domain(self.host()),
            path: COOKIE_PATH.to_string(),
            secure: self.is_secure(),
        }
    }
}

impl fmt::Display for AppOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.origin().ascii_serialization())
    }
}

impl FromStr for AppOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Scoping attributes shared by setting and removing token cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieScope {
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
}

impl CookieScope {
    /// Scope for a hostname served over HTTP or HTTPS.
    pub fn for_host(hostname: &str, secure: bool) -> Self {
        Self {
            domain: compute_cookie_domain(hostname),
            path: COOKIE_PATH.to_string(),
            secure,
        }
    }
}
