//! Backend endpoint paths.

use std::fmt;

/// Exchanges credentials for a token pair.
pub const TOKEN_PAIR: &str = "/api/token/pair";

/// Checks whether an access token is still valid.
pub const TOKEN_VERIFY: &str = "/api/token/verify";

/// Exchanges a refresh token for a new access token.
pub const TOKEN_REFRESH: &str = "/api/token/refresh";

/// Creates an account.
pub const REGISTER: &str = "/api/auth/register/";

const ISSUANCE_ENDPOINTS: [&str; 4] = [
    TOKEN_PAIR,
    TOKEN_VERIFY,
    TOKEN_REFRESH,
    "/api/auth/register",
];

/// Returns true if `path` creates an account or creates, validates or
/// refreshes tokens.
///
/// Requests to these endpoints never carry the stored access token and a
/// 401 from them never triggers a refresh. Query strings and a trailing
/// slash are ignored; absolute URLs are matched on their path.
pub fn is_issuance_endpoint(path: &str) -> bool {
    let path = strip_origin(path);
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    ISSUANCE_ENDPOINTS.contains(&path)
}

fn strip_origin(path: &str) -> &str {
    match path.find("://") {
        Some(scheme_end) => {
            let rest = &path[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => path,
    }
}

/// CRUD collections served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Orders,
    Skeleton,
    Releases,
    Waitlists,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Orders,
        Collection::Skeleton,
        Collection::Releases,
        Collection::Waitlists,
    ];

    /// The collection path, with its trailing slash.
    pub fn path(self) -> &'static str {
        match self {
            Collection::Orders => "/api/orders/",
            Collection::Skeleton => "/api/skeleton/",
            Collection::Releases => "/api/releases/",
            Collection::Waitlists => "/api/waitlists/",
        }
    }

    /// Path of a single item.
    pub fn item_path(self, id: &str) -> String {
        format!("{}{}/", self.path(), id.trim_matches('/'))
    }

    pub fn name(self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::Skeleton => "skeleton",
            Collection::Releases => "releases",
            Collection::Waitlists => "waitlists",
        }
    }

    /// Look a collection up by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
