//! Configuration management for muri.
//!
//! Loads configuration from ${MURI_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How the authorization request for a protected link is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Issue the request ourselves, redirects disabled, and decode the
    /// outcome from the status, Location header, or JSON body.
    #[default]
    Programmatic,
    /// Hand the constructed URL to the browser and let the server redirect.
    Direct,
}

impl AccessMode {
    /// Returns the short display name for this mode.
    pub fn display_name(&self) -> &'static str {
        match self {
            AccessMode::Programmatic => "programmatic",
            AccessMode::Direct => "direct",
        }
    }

    /// Parses a mode from its display name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "programmatic" => Some(AccessMode::Programmatic),
            "direct" => Some(AccessMode::Direct),
            _ => None,
        }
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for muri configuration and data directories.
    //!
    //! MURI_HOME resolution order:
    //! 1. MURI_HOME environment variable (if set)
    //! 2. ~/.config/muri (default)

    use std::path::PathBuf;

    /// Returns the muri home directory.
    ///
    /// Checks MURI_HOME env var first, falls back to ~/.config/muri
    pub fn muri_home() -> PathBuf {
        if let Ok(home) = std::env::var("MURI_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("muri"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        muri_home().join("config.toml")
    }

    /// Returns the path to the session marker file.
    pub fn session_path() -> PathBuf {
        muri_home().join("session")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        muri_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the link service (overridden by MURI_BASE_URL)
    pub base_url: Option<String>,

    /// How protected links are unlocked
    pub access_mode: AccessMode,

    /// Timeout for the authorization request in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// IP geolocation fallback endpoint
    pub ip_lookup_url: String,

    /// Platform location command for GPS fixes
    pub location_command: Option<String>,
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 30;
    const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the `access_mode` field to the config file.
    ///
    /// Creates the file if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    pub fn save_access_mode(mode: AccessMode) -> Result<()> {
        Self::save_access_mode_to(&paths::config_path(), mode)
    }

    /// Saves only the `access_mode` field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_access_mode_to(path: &Path, mode: AccessMode) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["access_mode"] = value(mode.display_name());

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the authorization request timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs as u64))
        }
    }

    /// Returns the effective base URL if set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            access_mode: AccessMode::default(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            ip_lookup_url: Self::DEFAULT_IP_LOOKUP_URL.to_string(),
            location_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Config loading: missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.access_mode, AccessMode::Programmatic);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.ip_lookup_url, "https://ipapi.co/json/");
        assert_eq!(config.base_url, None);
    }

    /// Config loading: partial config merges with defaults.
    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "access_mode = \"direct\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.access_mode, AccessMode::Direct);
        assert_eq!(config.request_timeout_secs, 30);
    }

    /// Config init: creates file with defaults, creates parent dirs.
    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("access_mode = \"programmatic\""));
        assert!(contents.contains("# base_url ="));
    }

    /// Config init: fails if file exists (no silent overwrite).
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    /// Timeout: zero disables timeout.
    #[test]
    fn test_request_timeout_zero_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    /// Base URL: loaded from config file.
    #[test]
    fn test_base_url_loaded_from_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "base_url = \"https://short.example.com\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.effective_base_url(),
            Some("https://short.example.com")
        );
    }

    /// Base URL: empty/whitespace treated as unset.
    #[test]
    fn test_base_url_empty_is_none() {
        let config = Config {
            base_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_base_url(), None);
    }

    /// save_access_mode: creates new config file with template if missing.
    #[test]
    fn test_save_access_mode_creates_file_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::save_access_mode_to(&config_path, AccessMode::Direct).unwrap();

        assert!(config_path.exists());

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.access_mode, AccessMode::Direct);

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# muri Configuration"));
        assert!(contents.contains("# location_command ="));
    }

    /// save_access_mode: preserves other fields in existing config.
    #[test]
    fn test_save_access_mode_preserves_other_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"access_mode = "programmatic"
request_timeout_secs = 60
ip_lookup_url = "https://geo.example.com/json"
"#,
        )
        .unwrap();

        Config::save_access_mode_to(&config_path, AccessMode::Direct).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.access_mode, AccessMode::Direct);
        assert_eq!(config.request_timeout_secs, 60); // preserved
        assert_eq!(config.ip_lookup_url, "https://geo.example.com/json"); // preserved
    }

    /// save_access_mode: uses template structure but preserves user values.
    #[test]
    fn test_save_access_mode_merges_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        // Old format without template comments
        fs::write(&config_path, "request_timeout_secs = 15\n").unwrap();

        Config::save_access_mode_to(&config_path, AccessMode::Direct).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# muri Configuration"));
        assert!(contents.contains("access_mode = \"direct\""));
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.request_timeout_secs, 15);
    }

    /// AccessMode: parse accepts display names, rejects unknown.
    #[test]
    fn test_access_mode_parse() {
        assert_eq!(AccessMode::parse("direct"), Some(AccessMode::Direct));
        assert_eq!(
            AccessMode::parse(" Programmatic "),
            Some(AccessMode::Programmatic)
        );
        assert_eq!(AccessMode::parse("browser"), None);
    }
}
