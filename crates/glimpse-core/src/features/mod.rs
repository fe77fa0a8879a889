//! Image feature extraction.
//!
//! A pretrained convolutional backbone with its classification head removed
//! maps a resized, normalized RGB image to a fixed-length feature vector.
//! The backbone runs locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use glimpse_core::features::{FeatureExtractor, OnnxFeatureExtractor};
//! use glimpse_core::Config;
//!
//! let config = Config::default();
//! let extractor = OnnxFeatureExtractor::load(&config.backbone_path(), &config.model)?;
//! let features = extractor.extract(&decoded_image)?;
//! // DenseNet201 exports yield 1920 values
//! ```

pub(crate) mod backbone;
pub(crate) mod preprocess;

use std::path::Path;

use image::DynamicImage;

use crate::config::{ModelConfig, TensorLayout};
use crate::error::PipelineError;

pub use self::preprocess::preprocess;
use self::backbone::BackboneSession;

/// Fixed-length numeric summary of one image.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFeatures(Vec<f32>);

impl ImageFeatures {
    /// Wrap a raw feature vector.
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// The feature values.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of feature dimensions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Anything that turns a decoded image into a feature vector.
pub trait FeatureExtractor: Send + Sync {
    /// Compute the feature vector for one image.
    ///
    /// Images are converted to 3-channel RGB first, so grayscale and RGBA
    /// inputs are accepted rather than rejected for their channel count.
    fn extract(&self, image: &DynamicImage) -> Result<ImageFeatures, PipelineError>;
}

/// Feature extractor backed by an ONNX backbone.
pub struct OnnxFeatureExtractor {
    session: BackboneSession,
    image_size: u32,
    layout: TensorLayout,
}

impl OnnxFeatureExtractor {
    /// Load the backbone at `model_path`.
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Backbone not found at {:?}. Check `glimpse models list`.",
                    model_path
                ),
            });
        }

        tracing::info!("Loading backbone from {:?}", model_path);
        let session = BackboneSession::load(model_path)?;
        tracing::info!("Backbone loaded successfully");

        Ok(Self {
            session,
            image_size: config.image_size,
            layout: config.layout,
        })
    }

    /// Square input resolution of this backbone.
    pub fn image_size(&self) -> u32 {
        self.image_size
    }
}

impl FeatureExtractor for OnnxFeatureExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<ImageFeatures, PipelineError> {
        let tensor = preprocess(image, self.image_size, self.layout);
        let values = self.session.run(&tensor)?;
        if values.is_empty() {
            return Err(PipelineError::Inference {
                stage: "feature extraction",
                message: "Backbone produced an empty feature vector".to_string(),
            });
        }
        Ok(ImageFeatures::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxFeatureExtractor::load(&dir.path().join("missing.onnx"), &ModelConfig::default());
        match result {
            Err(PipelineError::Model { message }) => assert!(message.contains("not found")),
            _ => panic!("expected a model error"),
        }
    }

    #[test]
    fn test_image_features_accessors() {
        let features = ImageFeatures::new(vec![0.5, 1.5]);
        assert_eq!(features.len(), 2);
        assert!(!features.is_empty());
        assert_eq!(features.as_slice(), &[0.5, 1.5]);
    }
}
