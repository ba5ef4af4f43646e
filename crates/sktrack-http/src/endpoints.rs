//! Wire types for the token endpoints.

use serde::Deserialize;

/// Response from the token pairing endpoint.
///
/// Both fields are optional on the wire; a success without both is a
/// malformed response, not a partial login.
#[derive(Debug, Deserialize)]
pub(crate) struct PairResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Response from the refresh endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: Option<String>,
}
