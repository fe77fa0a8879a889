//! Configuration management for Glimpse.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every config struct implements `Default`, so a missing file or a
//! partial file is always usable.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "GLIMPSE_DATABASE_URL";

/// Environment variable overriding `session.secret`.
pub const SESSION_SECRET_ENV: &str = "GLIMPSE_SESSION_SECRET";

/// Root configuration structure for Glimpse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Account database settings
    pub database: DatabaseConfig,

    /// Session cookie settings
    pub session: SessionConfig,

    /// Caption model settings
    pub model: ModelConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.glimpse.glimpse/config.toml
    /// - Linux: ~/.config/glimpse/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\glimpse\config\config.toml
    ///
    /// Falls back to ~/.glimpse/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "glimpse", "glimpse")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".glimpse").join("config.toml")
            })
    }

    /// Apply `GLIMPSE_DATABASE_URL` / `GLIMPSE_SESSION_SECRET` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            tracing::debug!("Using database URL from {DATABASE_URL_ENV}");
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var(SESSION_SECRET_ENV) {
            tracing::debug!("Using session secret from {SESSION_SECRET_ENV}");
            self.session.secret = secret;
        }
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        expand(&self.general.model_dir)
    }

    /// Get the resolved upload directory path (with ~ expansion).
    pub fn upload_dir(&self) -> PathBuf {
        expand(&self.server.upload_dir)
    }

    /// Full path of the backbone model.
    pub fn backbone_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.backbone)
    }

    /// Full path of the caption decoder model.
    pub fn decoder_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.decoder)
    }

    /// Full path of the tokenizer file.
    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.tokenizer)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
