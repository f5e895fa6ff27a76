//! Configuration management for chirp.
//!
//! Loads configuration from ${CHIRP_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "CHIRP_FIREBASE_API_KEY";
pub const IDENTITY_BASE_URL_ENV: &str = "CHIRP_IDENTITY_BASE_URL";
pub const FIRESTORE_BASE_URL_ENV: &str = "CHIRP_FIRESTORE_BASE_URL";
pub const STORAGE_BASE_URL_ENV: &str = "CHIRP_STORAGE_BASE_URL";

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com";

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for chirp configuration and data directories.
    //!
    //! CHIRP_HOME resolution order:
    //! 1. CHIRP_HOME environment variable (if set)
    //! 2. ~/.config/chirp (default)

    use std::path::PathBuf;

    /// Returns the chirp home directory.
    ///
    /// Checks CHIRP_HOME env var first, falls back to ~/.config/chirp
    pub fn chirp_home() -> PathBuf {
        if let Ok(home) = std::env::var("CHIRP_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_default()
            .join(".config")
            .join("chirp")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        chirp_home().join("config.toml")
    }

    /// Returns the directory log files are written to.
    pub fn log_dir() -> PathBuf {
        chirp_home().join("logs")
    }
}

/// Which collaborator implementation the client runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local in-process store seeded with demo data.
    #[default]
    Memory,
    /// Firebase project over its REST APIs.
    Firebase,
}

/// Firebase project settings.
///
/// The first seven keys are the web SDK initialization values; only
/// `api_key`, `project_id` and `storage_bucket` are needed over REST.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub database_url: Option<String>,
    pub identity_base_url: Option<String>,
    pub firestore_base_url: Option<String>,
    pub storage_base_url: Option<String>,
}

impl FirebaseConfig {
    /// Resolves the API key (config > `CHIRP_FIREBASE_API_KEY`).
    ///
    /// # Errors
    /// Returns an error if neither source provides a key.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = non_empty(self.api_key.as_deref()) {
            return Ok(key.to_string());
        }

        std::env::var(API_KEY_ENV).context(format!(
            "No API key available. Set {API_KEY_ENV} or api_key in [firebase]."
        ))
    }

    /// # Errors
    /// Returns an error if `project_id` is not set.
    pub fn require_project_id(&self) -> Result<&str> {
        non_empty(self.project_id.as_deref())
            .context("Missing project_id in [firebase].")
    }

    /// # Errors
    /// Returns an error if `storage_bucket` is not set.
    pub fn require_storage_bucket(&self) -> Result<&str> {
        non_empty(self.storage_bucket.as_deref())
            .context("Missing storage_bucket in [firebase].")
    }

    /// # Errors
    /// Returns an error if an override is not a valid URL.
    pub fn identity_base_url(&self) -> Result<String> {
        resolve_base_url(
            self.identity_base_url.as_deref(),
            IDENTITY_BASE_URL_ENV,
            DEFAULT_IDENTITY_BASE_URL,
            "identity",
        )
    }

    /// # Errors
    /// Returns an error if an override is not a valid URL.
    pub fn firestore_base_url(&self) -> Result<String> {
        resolve_base_url(
            self.firestore_base_url.as_deref(),
            FIRESTORE_BASE_URL_ENV,
            DEFAULT_FIRESTORE_BASE_URL,
            "firestore",
        )
    }

    /// # Errors
    /// Returns an error if an override is not a valid URL.
    pub fn storage_base_url(&self) -> Result<String> {
        resolve_base_url(
            self.storage_base_url.as_deref(),
            STORAGE_BASE_URL_ENV,
            DEFAULT_STORAGE_BASE_URL,
            "storage",
        )
    }
}

/// Feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Polling cadence for live queries over REST.
    pub poll_interval_ms: u64,
    pub posts_collection: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1500,
            posts_collection: "posts".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `CHIRP_LOG` overrides it.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub firebase: FirebaseConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
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

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
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

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Resolves a base URL with precedence: env > config > default.
fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    service_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, service_name)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = non_empty(config_base_url) {
        validate_url(config_url, service_name)?;
        return Ok(config_url.to_string());
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, service_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {service_name} base URL: {url}"))?;
    Ok(())
}
