//! Decoding uploaded images off the async runtime.
//!
//! The container format is sniffed from the bytes first and only inferred
//! from the file extension when sniffing fails. Decoding is bounded by
//! `limits.decode_timeout_ms` and the result by `limits.max_image_dimension`.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Turns raw upload bytes into pixels.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// A decoded upload.
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Container format the pixels came from
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read `path` from disk and decode it.
    pub async fn decode(&self, path: &Path) -> Result<DecodedImage, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(decode_error(path, format!("Cannot read file: {e}"))),
        };
        self.decode_from_bytes(bytes, path).await
    }

    /// Decode bytes already in memory.
    ///
    /// `path` only feeds the extension fallback and error messages; uploads
    /// are decoded from the request body rather than re-read from disk.
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DecodedImage, PipelineError> {
        let budget = Duration::from_millis(self.limits.decode_timeout_ms);
        let owned: PathBuf = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || decode_blocking(bytes, &owned));

        let decoded = match tokio::time::timeout(budget, task).await {
            Err(_) => {
                return Err(PipelineError::Timeout {
                    path: path.to_path_buf(),
                    stage: "decode".to_string(),
                    timeout_ms: self.limits.decode_timeout_ms,
                })
            }
            Ok(Err(join)) => return Err(decode_error(path, format!("Decode task failed: {join}"))),
            Ok(Ok(result)) => result?,
        };

        let max_dim = self.limits.max_image_dimension;
        if decoded.width.max(decoded.height) > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width: decoded.width,
                height: decoded.height,
                max_dim,
            });
        }
        Ok(decoded)
    }
}

fn decode_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        message,
    }
}

/// Sniff, decode and measure. Runs on the blocking pool.
fn decode_blocking(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, PipelineError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(path, format!("Cannot detect image format: {e}")))?;

    let format = match reader.format() {
        Some(format) => format,
        None => {
            let format =
                ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "unknown".to_string()),
                })?;
            reader.set_format(format);
            format
        }
    };

    let image = reader
        .decode()
        .map_err(|e| decode_error(path, e.to_string()))?;
    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        image,
        format,
        width,
        height,
    })
}
