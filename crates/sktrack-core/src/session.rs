//! The in-memory authentication state.

use crate::tokens::{AccessToken, RefreshToken, TokenPair};

/// The logical authentication state of the application.
///
/// Whether the session is authenticated is derived from the presence of an
/// access token, so it can never claim to be authenticated without one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    loading: bool,
}

impl Session {
    /// A fresh, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// True while a validation, login or refresh is in flight.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Populate the session from a persisted pair.
    pub fn authenticate(&mut self, pair: TokenPair) {
        let (access, refresh) = pair.into_parts();
        self.access_token = Some(access);
        self.refresh_token = Some(refresh);
    }

    /// Drop both tokens.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
