//! sktrack-store - Cookie-jar token store.
//!
//! Persists the access/refresh token pair the way the dashboard does in a
//! browser: two cookies, `accessToken` (1 day) and `refreshToken` (7 days),
//! scoped by a domain computed from the app origin.

mod jar;
mod store;

pub use store::{ACCESS_COOKIE, ACCESS_TTL, CookieTokenStore, REFRESH_COOKIE, REFRESH_TTL};
