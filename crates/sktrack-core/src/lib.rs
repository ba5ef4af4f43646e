//! sktrack-core - Core session, token and error types.
//!
//! The dashboard client is split in three layers: a [`TokenStore`] that
//! persists the token pair, an authenticated HTTP client that refreshes it
//! silently, and a session controller that owns the in-memory [`Session`].
//! This crate holds what all three share.

pub mod credentials;
pub mod error;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::{Credentials, Registration};
pub use error::{ApiError, AuthError, Error, ErrorCode, ErrorKind, FieldErrors, StorageError};
pub use session::Session;
pub use tokens::{AccessToken, RefreshToken, TokenPair};
pub use traits::TokenStore;
pub use types::{
    ApiUrl, AppOrigin, Collection, CookieScope, Environment, compute_cookie_domain,
    is_issuance_endpoint,
};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
