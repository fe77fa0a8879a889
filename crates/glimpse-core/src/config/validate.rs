//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "server.allowed_extensions must not be empty".into(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be > 0".into(),
            ));
        }
        if self.session.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "session.secret must not be empty".into(),
            ));
        }
        if self.session.cookie_name.is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::ValidationError(
                "session.cookie_name must be non-empty and contain only [A-Za-z0-9_-]".into(),
            ));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if self.model.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_length must be > 0".into(),
            ));
        }
        if self.model.start_token.is_empty() || self.model.end_token.is_empty() {
            return Err(ConfigError::ValidationError(
                "model.start_token and model.end_token must not be empty".into(),
            ));
        }
        if self.model.start_token == self.model.end_token {
            return Err(ConfigError::ValidationError(
                "model.start_token and model.end_token must differ".into(),
            ));
        }
        if self.limits.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_upload_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.inference_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.inference_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
