//! Settings configuration loaded from TOML files.
//!
//! This module handles configuration stored in TOML format in the XDG config
//! directory (~/.config/vault-tidy/config.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# vault-tidy configuration file
# Located at: ~/.config/vault-tidy/config.toml
# (or $VAULT_TIDY_CONFIG_DIR/config.toml when that variable is set)

[layout]
# Folder name that holds attachments, as written in links: [[_resources/file.png]]
resources_dir = "_resources"
# Extension of note files (without the dot)
note_extension = "md"

[hashing]
# Read buffer size in bytes used when fingerprinting resources
chunk_size = 65536

[logging]
# Used when RUST_LOG is not set (error, warn, info, debug, trace)
level = "info"
"#;

/// Settings loaded from the TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Vault layout conventions
    #[serde(default)]
    pub layout: LayoutSection,

    /// Resource fingerprinting
    #[serde(default)]
    pub hashing: HashingSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Vault layout section. Unset values fall back to the defaults in
/// [`LayoutSettings`](super::LayoutSettings).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutSection {
    /// Name of the attachment folder
    pub resources_dir: Option<String>,

    /// Extension of note files
    pub note_extension: Option<String>,
}

/// Fingerprinting settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashingSettings {
    /// Read buffer size in bytes
    pub chunk_size: Option<usize>,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/vault-tidy/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("VAULT_TIDY_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("vault-tidy");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }
}
