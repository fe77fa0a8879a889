//! Error types for the Glimpse captioning service.
//!
//! Errors are organized by concern so that the HTTP boundary can map each
//! family to a status code without inspecting messages.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Glimpse operations.
#[derive(Error, Debug)]
pub enum GlimpseError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image decoding and inference errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Account store errors
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while turning an uploaded image into a caption.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// A model or tokenizer artifact could not be loaded
    #[error("Model error: {message}")]
    Model { message: String },

    /// A forward pass failed or produced unusable output
    #[error("Inference failed in {stage}: {message}")]
    Inference { stage: &'static str, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Whether the failure was caused by the uploaded input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::ImageTooLarge { .. } | PipelineError::UnsupportedFormat { .. }
        )
    }
}

/// Account store errors.
#[derive(Error, Debug)]
pub enum AccountError {
    /// An account with this email already exists
    #[error("User with this email already exists")]
    DuplicateEmail,

    /// Unknown email or wrong password (deliberately indistinguishable)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Password hashing or hash parsing failed
    #[error("Password hashing failed: {0}")]
    Hash(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for Glimpse results.
pub type Result<T> = std::result::Result<T, GlimpseError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        let err = PipelineError::ImageTooLarge {
            path: PathBuf::from("big.png"),
            width: 20000,
            height: 10,
            max_dim: 10000,
        };
        assert!(err.is_client_error());

        let err = PipelineError::Inference {
            stage: "decoder",
            message: "boom".into(),
        };
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_account_error_messages_match_api_contract() {
        assert_eq!(
            AccountError::DuplicateEmail.to_string(),
            "User with this email already exists"
        );
        assert_eq!(
            AccountError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
