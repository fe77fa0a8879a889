//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder session secret shipped in the defaults.
///
/// The server logs a warning at startup while this value is in use.
pub const DEFAULT_SESSION_SECRET: &str = "glimpse-development-secret-change-me";

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where model artifacts are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.glimpse/models"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,

    /// Upload extensions accepted by `/predict` (lowercase, no dot)
    pub allowed_extensions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("static/uploads"),
            allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
        }
    }
}

/// Account database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://glimpse.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret the cookie signing key is derived from
    pub secret: String,

    /// Name of the session cookie
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SESSION_SECRET.to_string(),
            cookie_name: "glimpse_session".to_string(),
        }
    }
}

impl SessionConfig {
    /// Whether the built-in placeholder secret is still configured.
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SESSION_SECRET
    }
}

/// Memory layout of the backbone's image input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[batch, height, width, channels]` (Keras/TensorFlow exports)
    Nhwc,
    /// `[batch, channels, height, width]` (PyTorch exports)
    Nchw,
}

/// Element type the decoder model expects for token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceDtype {
    Float32,
    Int64,
}

/// Caption model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backbone ONNX filename inside the model directory
    pub backbone: String,

    /// Caption decoder ONNX filename inside the model directory
    pub decoder: String,

    /// Tokenizer JSON filename inside the model directory
    pub tokenizer: String,

    /// Square input resolution of the backbone
    pub image_size: u32,

    /// Backbone input layout
    pub layout: TensorLayout,

    /// Token index element type for the decoder
    pub sequence_dtype: SequenceDtype,

    /// Padded sequence length the decoder was trained with
    pub max_length: usize,

    /// Start-of-caption sentinel word
    pub start_token: String,

    /// End-of-caption sentinel word
    pub end_token: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backbone: "densenet201.onnx".to_string(),
            decoder: "caption_decoder.onnx".to_string(),
            tokenizer: "tokenizer.json".to_string(),
            image_size: 224,
            layout: TensorLayout::Nhwc,
            sequence_dtype: SequenceDtype::Float32,
            max_length: 34,
            start_token: "startseq".to_string(),
            end_token: "endseq".to_string(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload body size in megabytes
    pub max_upload_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Feature extraction + caption decoding timeout in milliseconds
    pub inference_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 16,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            inference_timeout_ms: 30000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
