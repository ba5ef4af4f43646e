//! A cookie jar with browser deletion semantics.
//!
//! Cookies are keyed by name, domain and path. Setting a cookie replaces the
//! entry with the same key; removing one only deletes an entry whose key
//! matches exactly. A removal sent with different scoping attributes than
//! the cookie was set with is a silent no-op, as it is in a browser.

use cookie::Cookie;
use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub(crate) struct CookieJar {
    cookies: Vec<Cookie<'static>>,
}

impl CookieJar {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Parse a jar from `Set-Cookie` strings, skipping any that don't parse.
    pub(crate) fn from_set_cookie_strings(lines: Vec<String>) -> Self {
        let cookies = lines
            .into_iter()
            .filter_map(|line| match Cookie::parse(line) {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unparseable cookie");
                    None
                }
            })
            .collect();
        Self { cookies }
    }

    /// Serialize as `Set-Cookie` strings, dropping expired entries.
    pub(crate) fn to_set_cookie_strings(&self, now: OffsetDateTime) -> Vec<String> {
        self.cookies
            .iter()
            .filter(|c| !is_expired(c, now))
            .map(|c| c.to_string())
            .collect()
    }

    /// Insert or replace the cookie with the same name, domain and path.
    pub(crate) fn set(&mut self, cookie: Cookie<'static>) {
        self.cookies.retain(|existing| !same_key(existing, &cookie));
        self.cookies.push(cookie);
    }

    /// Value of the named cookie visible from `host`, ignoring expired ones.
    pub(crate) fn get(&self, name: &str, host: &str, now: OffsetDateTime) -> Option<&str> {
        self.cookies
            .iter()
            .filter(|c| c.name() == name && !is_expired(c, now))
            .filter(|c| domain_matches(c.domain(), host))
            .map(|c| c.value())
            .find(|v| !v.is_empty())
    }

    /// Delete the cookie with exactly this name, domain and path.
    ///
    /// Returns true if an entry was removed.
    pub(crate) fn remove(&mut self, name: &str, domain: Option<&str>, path: &str) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|c| {
            !(c.name() == name
                && normalize_domain(c.domain()) == normalize_domain(domain)
                && c.path().unwrap_or("/") == path)
        });
        self.cookies.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.cookies.len()
    }
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    cookie.expires_datetime().is_some_and(|at| at <= now)
}

fn same_key(a: &Cookie<'_>, b: &Cookie<'_>) -> bool {
    a.name() == b.name()
        && normalize_domain(a.domain()) == normalize_domain(b.domain())
        && a.path().unwrap_or("/") == b.path().unwrap_or("/")
}

/// `.example.com` and `example.com` name the same cookie domain.
fn normalize_domain(domain: Option<&str>) -> Option<String> {
    domain
        .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

fn domain_matches(domain: Option<&str>, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    match normalize_domain(domain) {
        None => true,
        Some(d) => host == d || host.ends_with(&format!(".{}", d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie::SameSite;
    use time::Duration;

    fn cookie(name: &str, value: &str, domain: Option<&str>, days: i64) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .expires(OffsetDateTime::now_utc() + Duration::days(days));
        if let Some(domain) = domain {
            builder = builder.domain(domain.to_string());
        }
        builder.build()
    }

    #[test]
    fn set_replaces_same_key() {
        let mut jar = CookieJar::new();
        jar.set(cookie("accessToken", "a1", Some(".example.com"), 1));
        jar.set(cookie("accessToken", "a2", Some("example.com"), 1));

        assert_eq!(jar.len(), 1);
        assert_eq!(
            jar.get("accessToken", "dash.example.com", OffsetDateTime::now_utc()),
            Some("a2")
        );
    }

    #[test]
    fn expired_cookies_are_invisible() {
        let mut jar = CookieJar::new();
        jar.set(cookie("accessToken", "a1", None, -1));
        assert_eq!(
            jar.get("accessToken", "localhost", OffsetDateTime::now_utc()),
            None
        );
        assert!(jar.to_set_cookie_strings(OffsetDateTime::now_utc()).is_empty());
    }

    #[test]
    fn removal_with_other_domain_is_a_no_op() {
        let mut jar = CookieJar::new();
        jar.set(cookie("refreshToken", "r1", Some(".example.com"), 7));

        assert!(!jar.remove("refreshToken", None, "/"));
        assert!(!jar.remove("refreshToken", Some(".other.com"), "/"));
        assert_eq!(jar.len(), 1);

        assert!(jar.remove("refreshToken", Some(".example.com"), "/"));
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn domain_must_match_host() {
        let mut jar = CookieJar::new();
        jar.set(cookie("accessToken", "a1", Some(".example.com"), 1));
        let now = OffsetDateTime::now_utc();

        assert_eq!(jar.get("accessToken", "example.com", now), Some("a1"));
        assert_eq!(jar.get("accessToken", "api.example.com", now), Some("a1"));
        assert_eq!(jar.get("accessToken", "notexample.com", now), None);
    }

    #[test]
    fn set_cookie_strings_round_trip() {
        let mut jar = CookieJar::new();
        jar.set(cookie("accessToken", "a1", Some(".example.com"), 1));
        jar.set(cookie("refreshToken", "r1", Some(".example.com"), 7));

        let now = OffsetDateTime::now_utc();
        let restored = CookieJar::from_set_cookie_strings(jar.to_set_cookie_strings(now));

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("refreshToken", "example.com", now), Some("r1"));
    }
}
