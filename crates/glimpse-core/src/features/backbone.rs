//! Backbone ONNX session management and inference.
//!
//! Loads a classification network exported to ONNX without its
//! classification head (global average pooling output) and runs it to
//! produce one feature vector per image.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// Wraps an ONNX Runtime session for the pooled backbone.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct BackboneSession {
    session: Mutex<Session>,
    /// Name of the image input tensor (detected from model metadata).
    input_name: String,
    /// Name of the pooled feature output (detected from model metadata).
    output_name: String,
}

impl BackboneSession {
    /// Load a backbone from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load backbone {:?}: {e}", model_path),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| PipelineError::Model {
                message: format!("Backbone {:?} declares no inputs", model_path),
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| PipelineError::Model {
                message: format!("Backbone {:?} declares no outputs", model_path),
            })?;

        tracing::debug!(
            "Loaded backbone from {:?} (input: {:?}, output: {:?})",
            model_path,
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Run the backbone on a preprocessed image tensor.
    ///
    /// Output may be `[1, D]` or `[D]`; anything else is an error.
    pub fn run(&self, preprocessed: &Array4<f32>) -> Result<Vec<f32>, PipelineError> {
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data)).map_err(|e| inference(format!(
            "Failed to create input tensor: {e}"
        )))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| inference(format!("ONNX inference failed: {e}")))?;

        let pooled = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name)
            .ok_or_else(|| inference(format!("Model did not produce {}", self.output_name)))?;

        let (shape, data) = pooled
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| inference(format!("Failed to extract feature tensor: {e}")))?;

        match shape.len() {
            1 => Ok(data.to_vec()),
            2 if shape[0] == 1 => {
                let dim = shape[1] as usize;
                Ok(data[..dim].to_vec())
            }
            _ => Err(inference(format!(
                "Unexpected backbone output shape: {:?}",
                shape
            ))),
        }
    }
}

fn inference(message: String) -> PipelineError {
    PipelineError::Inference {
        stage: "feature extraction",
        message,
    }
}
