//! Cookie-backed token store.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cookie::{Cookie, SameSite};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, instrument, warn};

use sktrack_core::error::StorageError;
use sktrack_core::traits::TokenStore;
use sktrack_core::types::{AppOrigin, CookieScope};
use sktrack_core::{AccessToken, RefreshToken, TokenPair};

use crate::jar::CookieJar;

/// Cookie holding the access token.
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Lifetime of the access cookie.
pub const ACCESS_TTL: Duration = Duration::days(1);

/// Lifetime of the refresh cookie. Must outlive the access cookie so a
/// refresh stays possible for the whole access lifetime.
pub const REFRESH_TTL: Duration = Duration::days(7);

/// On-disk layout of a persisted jar.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JarFile {
    cookies: Vec<String>,
}

/// Token store that keeps the token pair as cookies.
///
/// Both cookies are written with `Path=/`, `SameSite=Lax`, the domain
/// computed from the app origin and `Secure` when the origin is HTTPS. The
/// same [`CookieScope`] is used to delete them, so a logout always clears
/// what a login wrote.
///
/// The jar lives in memory, optionally mirrored to a JSON file that is
/// re-read before every lookup so several processes share one session.
#[derive(Debug)]
pub struct CookieTokenStore {
    host: String,
    scope: CookieScope,
    jar: Mutex<CookieJar>,
    file: Option<PathBuf>,
}

impl CookieTokenStore {
    /// A store that only lives as long as the process.
    pub fn in_memory(origin: &AppOrigin) -> Self {
        Self {
            host: origin.host().to_string(),
            scope: origin.cookie_scope(),
            jar: Mutex::new(CookieJar::new()),
            file: None,
        }
    }

    /// A store mirrored to `path`, loading any cookies already there.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>, origin: &AppOrigin) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let jar = read_jar(&path)?;
        debug!(path = %path.display(), cookies = jar.len(), "Opened cookie jar");

        Ok(Self {
            host: origin.host().to_string(),
            scope: origin.cookie_scope(),
            jar: Mutex::new(jar),
            file: Some(path),
        })
    }

    /// The scoping attributes used for both writing and deleting.
    pub fn scope(&self) -> &CookieScope {
        &self.scope
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn build_cookie(&self, name: &'static str, value: &str, ttl: Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value.to_string()))
            .path(self.scope.path.clone())
            .secure(self.scope.secure)
            .same_site(SameSite::Lax)
            .expires(OffsetDateTime::now_utc() + ttl);
        if let Some(domain) = &self.scope.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// Current jar contents, refreshed from disk for file-backed stores.
    fn lookup(&self, name: &str) -> Option<String> {
        let mut jar = match self.jar.lock() {
            Ok(jar) => jar,
            Err(_) => {
                warn!(cookie = name, "Cookie jar lock poisoned");
                return None;
            }
        };

        if let Some(path) = &self.file {
            match read_jar(path) {
                Ok(fresh) => *jar = fresh,
                Err(e) => warn!(error = %e, "Failed to reload cookie jar, using cached cookies"),
            }
        }

        jar.get(name, &self.host, OffsetDateTime::now_utc())
            .map(str::to_string)
    }

    /// Apply `mutate` to a copy of the jar, persist it, then commit.
    ///
    /// The in-memory jar is only updated once the file write succeeded.
    fn update(&self, mutate: impl FnOnce(&mut CookieJar)) -> Result<(), StorageError> {
        let mut jar = self.jar.lock().map_err(|_| StorageError::Poisoned)?;

        let mut next = jar.clone();
        mutate(&mut next);

        if let Some(path) = &self.file {
            write_jar(path, &next)?;
        }

        *jar = next;
        Ok(())
    }
}

impl TokenStore for CookieTokenStore {
    #[instrument(skip(self, pair), fields(domain = ?self.scope.domain, secure = self.scope.secure))]
    fn set_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let access = self.build_cookie(ACCESS_COOKIE, pair.access().as_str(), ACCESS_TTL);
        let refresh = self.build_cookie(REFRESH_COOKIE, pair.refresh().as_str(), REFRESH_TTL);

        let result = self.update(|jar| {
            jar.set(access);
            jar.set(refresh);
        });

        match &result {
            Ok(()) => debug!("Tokens saved"),
            Err(e) => warn!(error = %e, "Failed to save tokens"),
        }
        result
    }

    fn access_token(&self) -> Option<AccessToken> {
        self.lookup(ACCESS_COOKIE).map(AccessToken::new)
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.lookup(REFRESH_COOKIE).map(RefreshToken::new)
    }

    #[instrument(skip(self), fields(domain = ?self.scope.domain))]
    fn remove_tokens(&self) {
        let domain = self.scope.domain.as_deref();
        let path = self.scope.path.as_str();

        let result = self.update(|jar| {
            jar.remove(ACCESS_COOKIE, domain, path);
            jar.remove(REFRESH_COOKIE, domain, path);
        });

        match result {
            Ok(()) => debug!("Tokens removed"),
            Err(e) => {
                warn!(error = %e, "Failed to persist token removal, clearing in memory only");
                if let Ok(mut jar) = self.jar.lock() {
                    jar.remove(ACCESS_COOKIE, domain, path);
                    jar.remove(REFRESH_COOKIE, domain, path);
                }
            }
        }
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

fn read_jar(path: &Path) -> Result<CookieJar, StorageError> {
    if !path.exists() {
        return Ok(CookieJar::new());
    }

    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    if content.trim().is_empty() {
        return Ok(CookieJar::new());
    }

    let file: JarFile = serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(CookieJar::from_set_cookie_strings(file.cookies))
}

fn write_jar(path: &Path, jar: &CookieJar) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let lock_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| io_error(&lock_path, e))?;

    lock_file
        .lock_exclusive()
        .map_err(|e| io_error(&lock_path, e))?;

    let file = JarFile {
        cookies: jar.to_set_cookie_strings(OffsetDateTime::now_utc()),
    };
    let content = serde_json::to_string_pretty(&file).map_err(|e| StorageError::Corrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &content).map_err(|e| io_error(&temp_path, e))?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&temp_path)
            .map_err(|e| io_error(&temp_path, e))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&temp_path, perms).map_err(|e| io_error(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| io_error(path, e))?;

    lock_file.unlock().map_err(|e| io_error(&lock_path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(AccessToken::new(access), RefreshToken::new(refresh))
    }

    #[test]
    fn refresh_outlives_access() {
        assert!(REFRESH_TTL > ACCESS_TTL);
    }

    #[test]
    fn missing_tokens_read_as_absent() {
        let origin = AppOrigin::new("http://localhost:3000").unwrap();
        let store = CookieTokenStore::in_memory(&origin);

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.token_pair().is_none());
    }

    #[test]
    fn set_then_get() {
        let origin = AppOrigin::new("https://dash.example.com").unwrap();
        let store = CookieTokenStore::in_memory(&origin);

        store.set_tokens(&pair("a1", "r1")).unwrap();

        assert_eq!(store.access_token().unwrap().as_str(), "a1");
        assert_eq!(store.refresh_token().unwrap().as_str(), "r1");
    }

    #[test]
    fn cookies_carry_scope_attributes() {
        let origin = AppOrigin::new("https://dash.example.com").unwrap();
        let store = CookieTokenStore::in_memory(&origin);
        let cookie = store.build_cookie(ACCESS_COOKIE, "a1", ACCESS_TTL);

        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(cookie.expires_datetime().is_some());
    }

    #[test]
    fn insecure_origin_has_no_secure_flag() {
        let origin = AppOrigin::new("http://localhost:3000").unwrap();
        let store = CookieTokenStore::in_memory(&origin);
        let cookie = store.build_cookie(REFRESH_COOKIE, "r1", REFRESH_TTL);

        assert_eq!(cookie.domain(), None);
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn remove_is_idempotent() {
        let origin = AppOrigin::new("http://localhost:3000").unwrap();
        let store = CookieTokenStore::in_memory(&origin);

        store.remove_tokens();
        store.set_tokens(&pair("a1", "r1")).unwrap();
        store.remove_tokens();
        store.remove_tokens();

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }
}
