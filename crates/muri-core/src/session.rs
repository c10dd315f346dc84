//! Authenticated-session flag.
//!
//! The service treats authentication as a simple boolean capability: signed-in
//! users may create customized links, everyone may shorten and open links.
//! muri persists that flag as a marker file under ${MURI_HOME}; the real
//! login flow lives on the website.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::paths;

/// Returns true if a session marker is present.
pub fn is_authenticated() -> bool {
    is_authenticated_at(&paths::session_path())
}

fn is_authenticated_at(path: &Path) -> bool {
    path.exists()
}

/// Records a logged-in session.
pub fn login() -> Result<PathBuf> {
    let path = paths::session_path();
    login_at(&path)?;
    Ok(path)
}

fn login_at(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, chrono::Utc::now().to_rfc3339())
        .with_context(|| format!("Failed to write session marker to {}", path.display()))
}

/// Clears the session marker. Succeeds if no session exists.
pub fn logout() -> Result<()> {
    logout_at(&paths::session_path())
}

fn logout_at(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session marker at {}", path.display()))?;
    }
    Ok(())
}
