//! Caption generation: feature extraction followed by greedy decoding.
//!
//! The [`Captioner`] owns every model artifact. It is built once at process
//! start and shared read-only between requests.

pub mod decoder;
pub mod sequence_model;
pub mod tokenizer;

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;

use crate::config::Config;
use crate::error::PipelineError;
use crate::features::{FeatureExtractor, OnnxFeatureExtractor};

pub use decoder::{strip_sentinels, Caption, CaptionDecoder, StopReason};
pub use sequence_model::{OnnxSequenceModel, SequenceModel};
pub use tokenizer::Tokenizer;

/// Image → caption pipeline.
pub struct Captioner {
    extractor: Arc<dyn FeatureExtractor>,
    decoder: CaptionDecoder,
}

impl Captioner {
    /// Assemble a captioner from already-built parts.
    pub fn new(extractor: Arc<dyn FeatureExtractor>, decoder: CaptionDecoder) -> Self {
        Self { extractor, decoder }
    }

    /// Load the backbone, decoder and tokenizer named in `config`.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let start = Instant::now();

        let extractor = OnnxFeatureExtractor::load(&config.backbone_path(), &config.model)?;
        let model = OnnxSequenceModel::load(&config.decoder_path(), config.model.sequence_dtype)?;
        let tokenizer = Tokenizer::load(&config.tokenizer_path())?;
        let decoder = CaptionDecoder::new(Arc::new(model), Arc::new(tokenizer), &config.model)?;

        tracing::info!(
            "Caption models ready in {:?} ({}px input, {} word vocabulary)",
            start.elapsed(),
            extractor.image_size(),
            decoder.tokenizer().vocab_size()
        );
        Ok(Self::new(Arc::new(extractor), decoder))
    }

    /// Caption one decoded image.
    pub fn caption(&self, image: &DynamicImage) -> Result<Caption, PipelineError> {
        let start = Instant::now();

        let features = self.extractor.extract(image)?;
        let extract_time = start.elapsed();
        tracing::trace!("  Features: {} dims in {:?}", features.len(), extract_time);

        let decode_start = Instant::now();
        let caption = self.decoder.decode(&features)?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        tracing::debug!(
            "Captioned image in {:?} ({} steps, {})",
            start.elapsed(),
            caption.steps,
            caption.stop
        );
        Ok(caption)
    }
}
