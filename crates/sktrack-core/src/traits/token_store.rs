//! Token store trait.

use std::sync::Arc;

use crate::error::StorageError;
use crate::tokens::{AccessToken, RefreshToken, TokenPair};

/// Durable storage for the session's token pair.
///
/// Only login, refresh and logout write to the store. Reads never fail:
/// a token that cannot be read is reported as absent.
pub trait TokenStore: Send + Sync {
    /// Persist both tokens.
    ///
    /// Implementations log their own failures; the returned error only tells
    /// the caller the pair is not durable.
    fn set_tokens(&self, pair: &TokenPair) -> Result<(), StorageError>;

    /// The stored access token, if any.
    fn access_token(&self) -> Option<AccessToken>;

    /// The stored refresh token, if any.
    fn refresh_token(&self) -> Option<RefreshToken>;

    /// Delete both tokens. Safe to call when nothing is stored.
    fn remove_tokens(&self);

    /// Both tokens, only when both are present.
    fn token_pair(&self) -> Option<TokenPair> {
        Some(TokenPair::new(self.access_token()?, self.refresh_token()?))
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn set_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        (**self).set_tokens(pair)
    }

    fn access_token(&self) -> Option<AccessToken> {
        (**self).access_token()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        (**self).refresh_token()
    }

    fn remove_tokens(&self) {
        (**self).remove_tokens()
    }
}
