//! Where the CLI keeps its cookie jar.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use sktrack_core::AppOrigin;
use sktrack_store::CookieTokenStore;

/// Default cookie jar location in the user data directory.
fn default_cookie_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "sktrack").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("cookies.json"))
}

/// Open the cookie-backed token store at `path`, or the default location.
pub fn open_store(path: Option<PathBuf>, origin: &AppOrigin) -> Result<CookieTokenStore> {
    let path = match path {
        Some(path) => path,
        None => default_cookie_path()?,
    };

    CookieTokenStore::open(&path, origin)
        .with_context(|| format!("Failed to open cookie jar at {}", path.display()))
}
