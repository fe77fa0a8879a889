//! Caption decoder ONNX session.
//!
//! The decoder takes the image feature vector and the padded token index
//! sequence and returns one score per vocabulary index for the next word.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::config::SequenceDtype;
use crate::error::PipelineError;
use crate::features::ImageFeatures;

/// Anything that scores the next token given image features and a prefix.
pub trait SequenceModel: Send + Sync {
    /// Return next-token scores indexed by vocabulary index.
    ///
    /// `sequence` is already padded to the model's fixed length.
    fn predict(&self, features: &ImageFeatures, sequence: &[u32]) -> Result<Vec<f32>, PipelineError>;
}

/// Sequence model backed by an ONNX Runtime session.
///
/// Uses the same `Mutex<Session>` pattern as the backbone.
pub struct OnnxSequenceModel {
    session: Mutex<Session>,
    features_input: String,
    sequence_input: String,
    output_name: String,
    sequence_dtype: SequenceDtype,
}

impl OnnxSequenceModel {
    /// Load the decoder from an ONNX file.
    ///
    /// The first declared input receives image features and the second the
    /// token sequence, matching the order the captioning model was built with.
    pub fn load(model_path: &Path, sequence_dtype: SequenceDtype) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Caption decoder not found at {:?}. Check `glimpse models list`.",
                    model_path
                ),
            });
        }

        tracing::info!("Loading caption decoder from {:?}", model_path);
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load caption decoder: {e}"),
            })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        let [features_input, sequence_input] = <[String; 2]>::try_from(input_names.clone())
            .map_err(|_| PipelineError::Model {
                message: format!(
                    "Caption decoder must take exactly two inputs (features, sequence), found {:?}",
                    input_names
                ),
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| PipelineError::Model {
                message: "Caption decoder declares no outputs".to_string(),
            })?;

        tracing::debug!(
            "Loaded caption decoder (features: {:?}, sequence: {:?}, output: {:?}, dtype: {:?})",
            features_input,
            sequence_input,
            output_name,
            sequence_dtype
        );

        Ok(Self {
            session: Mutex::new(session),
            features_input,
            sequence_input,
            output_name,
            sequence_dtype,
        })
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn predict(&self, features: &ImageFeatures, sequence: &[u32]) -> Result<Vec<f32>, PipelineError> {
        let features_value = Value::from_array((
            vec![1i64, features.len() as i64],
            features.as_slice().to_vec(),
        ))
        .map_err(|e| inference(format!("Failed to create features tensor: {e}")))?
        .into_dyn();

        let sequence_shape = vec![1i64, sequence.len() as i64];
        let sequence_value = match self.sequence_dtype {
            SequenceDtype::Float32 => {
                let data: Vec<f32> = sequence.iter().map(|&i| i as f32).collect();
                Value::from_array((sequence_shape, data)).map(|v| v.into_dyn())
            }
            SequenceDtype::Int64 => {
                let data: Vec<i64> = sequence.iter().map(|&i| i as i64).collect();
                Value::from_array((sequence_shape, data)).map(|v| v.into_dyn())
            }
        }
        .map_err(|e| inference(format!("Failed to create sequence tensor: {e}")))?;

        let inputs = ort::inputs![
            self.features_input.as_str() => features_value,
            self.sequence_input.as_str() => sequence_value
        ];

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference(format!("Decoder lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| inference(format!("ONNX inference failed: {e}")))?;

        let scores = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name)
            .ok_or_else(|| inference(format!("Model did not produce {}", self.output_name)))?;

        let (shape, data) = scores
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| inference(format!("Failed to extract scores: {e}")))?;

        // [1, vocab] for a single sequence
        match shape.len() {
            1 => Ok(data.to_vec()),
            2 if shape[0] == 1 => Ok(data.to_vec()),
            _ => Err(inference(format!("Unexpected decoder output shape: {:?}", shape))),
        }
    }
}

fn inference(message: String) -> PipelineError {
    PipelineError::Inference {
        stage: "caption decoding",
        message,
    }
}
