//! Greedy caption decoding.
//!
//! Starting from the start sentinel, the decoder repeatedly encodes the
//! words so far, pads them to the fixed length, asks the sequence model for
//! next-token scores and appends the single best word. It stops at the end
//! sentinel, after `max_length` steps, or when the best index has no word.

use std::fmt;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::features::ImageFeatures;
use crate::math::argmax;

use super::sequence_model::SequenceModel;
use super::tokenizer::{pad_sequence, Tokenizer};

/// Why decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model emitted the end sentinel
    EndToken,
    /// `max_length` steps ran without an end sentinel
    MaxLength,
    /// The best index had no word in the vocabulary
    UnknownIndex,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::EndToken => "end_token",
            StopReason::MaxLength => "max_length",
            StopReason::UnknownIndex => "unknown_index",
        };
        f.write_str(s)
    }
}

/// A finished caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    /// Caption text with sentinels removed
    pub text: String,
    /// Full generated word sequence, sentinels included
    pub words: Vec<String>,
    /// Number of sequence model calls made
    pub steps: usize,
    /// Why decoding stopped
    pub stop: StopReason,
}

/// Greedy decoder over a pretrained sequence model.
pub struct CaptionDecoder {
    model: Arc<dyn SequenceModel>,
    tokenizer: Arc<Tokenizer>,
    max_length: usize,
    start_token: String,
    end_token: String,
}

impl CaptionDecoder {
    /// Build a decoder, checking both sentinels exist in the vocabulary.
    pub fn new(
        model: Arc<dyn SequenceModel>,
        tokenizer: Arc<Tokenizer>,
        config: &ModelConfig,
    ) -> Result<Self, PipelineError> {
        for sentinel in [&config.start_token, &config.end_token] {
            if tokenizer.index_of(sentinel).is_none() {
                return Err(PipelineError::Model {
                    message: format!("Sentinel {sentinel:?} missing from tokenizer vocabulary"),
                });
            }
        }
        Ok(Self {
            model,
            tokenizer,
            max_length: config.max_length,
            start_token: config.start_token.clone(),
            end_token: config.end_token.clone(),
        })
    }

    /// The tokenizer this decoder encodes with.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Generate a caption for one image.
    ///
    /// Makes at most `max_length` model calls.
    pub fn decode(&self, features: &ImageFeatures) -> Result<Caption, PipelineError> {
        let mut words = vec![self.start_token.clone()];
        let mut text = self.start_token.clone();
        let mut stop = StopReason::MaxLength;
        let mut steps = 0;

        for _ in 0..self.max_length {
            let sequence = self.tokenizer.texts_to_sequence(&text);
            let padded = pad_sequence(&sequence, self.max_length);

            let scores = self.model.predict(features, &padded)?;
            steps += 1;

            let index = argmax(&scores).ok_or_else(|| PipelineError::Inference {
                stage: "caption decoding",
                message: format!("Sequence model returned no usable scores ({} values)", scores.len()),
            })?;

            let Some(word) = u32::try_from(index)
                .ok()
                .and_then(|i| self.tokenizer.word_at(i))
            else {
                tracing::debug!("No word for index {index} at step {steps}, stopping early");
                stop = StopReason::UnknownIndex;
                break;
            };

            text.push(' ');
            text.push_str(word);
            words.push(word.to_string());

            if word == self.end_token {
                stop = StopReason::EndToken;
                break;
            }
        }

        let caption = strip_sentinels(&words.join(" "), &self.start_token, &self.end_token);
        tracing::debug!("Decoded {:?} in {} steps ({})", caption, steps, stop);

        Ok(Caption {
            text: caption,
            words,
            steps,
            stop,
        })
    }
}

/// Remove every occurrence of both sentinels and normalize whitespace.
///
/// Removal repeats until neither sentinel remains, so the result never
/// contains either as a substring.
pub fn strip_sentinels(text: &str, start_token: &str, end_token: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = current.replace(start_token, "").replace(end_token, "");
        if next == current {
            break;
        }
        current = next;
    }
    current.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Plays back a scripted list of argmax indices, one per call.
    struct ScriptedModel {
        script: Vec<usize>,
        vocab: usize,
        calls: Mutex<Vec<Vec<u32>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<usize>, vocab: usize) -> Self {
            Self {
                script,
                vocab,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl SequenceModel for ScriptedModel {
        fn predict(&self, _features: &ImageFeatures, sequence: &[u32]) -> Result<Vec<f32>, PipelineError> {
            let mut calls = self.calls.lock().unwrap();
            let step = calls.len();
            calls.push(sequence.to_vec());
            if self.vocab == 0 {
                return Ok(Vec::new());
            }
            let best = *self.script.get(step).unwrap_or(&1);
            let mut scores = vec![0.01; self.vocab];
            scores[best] = 0.9;
            Ok(scores)
        }
    }

    fn tokenizer() -> Arc<Tokenizer> {
        let word_index: HashMap<String, u32> = [
            ("startseq", 1),
            ("endseq", 2),
            ("a", 3),
            ("dog", 4),
            ("runs", 5),
        ]
        .into_iter()
        .map(|(w, i)| (w.to_string(), i))
        .collect();
        Arc::new(Tokenizer::from_word_index(word_index).unwrap())
    }

    fn decoder(model: Arc<ScriptedModel>, max_length: usize) -> CaptionDecoder {
        let config = ModelConfig {
            max_length,
            ..ModelConfig::default()
        };
        CaptionDecoder::new(model, tokenizer(), &config).unwrap()
    }

    fn features() -> ImageFeatures {
        ImageFeatures::new(vec![0.0; 8])
    }

    #[test]
    fn test_stops_at_end_token() {
        let model = Arc::new(ScriptedModel::new(vec![3, 4, 5, 2], 8));
        let caption = decoder(model.clone(), 10).decode(&features()).unwrap();
        assert_eq!(caption.text, "a dog runs");
        assert_eq!(caption.stop, StopReason::EndToken);
        assert_eq!(caption.steps, 4);
        assert_eq!(caption.words.first().map(String::as_str), Some("startseq"));
        assert_eq!(caption.words.last().map(String::as_str), Some("endseq"));
    }

    #[test]
    fn test_exposes_its_tokenizer() {
        let model = Arc::new(ScriptedModel::new(vec![2], 8));
        let decoder = decoder(model, 10);
        assert_eq!(decoder.tokenizer().vocab_size(), tokenizer().vocab_size());
        assert_eq!(decoder.tokenizer().index_of("endseq"), Some(2));
    }

    #[test]
    fn test_feeds_left_padded_prefix() {
        let model = Arc::new(ScriptedModel::new(vec![3, 4, 2], 8));
        decoder(model.clone(), 5).decode(&features()).unwrap();
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[0], vec![0, 0, 0, 0, 1]);
        assert_eq!(calls[1], vec![0, 0, 0, 1, 3]);
        assert_eq!(calls[2], vec![0, 0, 1, 3, 4]);
    }

    #[test]
    fn test_terminates_at_max_length() {
        // Never emits the end sentinel
        let model = Arc::new(ScriptedModel::new(vec![4; 100], 8));
        let caption = decoder(model.clone(), 6).decode(&features()).unwrap();
        assert_eq!(caption.stop, StopReason::MaxLength);
        assert_eq!(caption.steps, 6);
        assert_eq!(model.calls.lock().unwrap().len(), 6);
        assert_eq!(caption.text, "dog dog dog dog dog dog");
    }

    #[test]
    fn test_unknown_index_stops_early() {
        // Index 0 is padding and index 7 is outside the vocabulary
        let model = Arc::new(ScriptedModel::new(vec![3, 7], 8));
        let caption = decoder(model.clone(), 10).decode(&features()).unwrap();
        assert_eq!(caption.stop, StopReason::UnknownIndex);
        assert_eq!(caption.text, "a");

        let model = Arc::new(ScriptedModel::new(vec![0], 8));
        let caption = decoder(model, 10).decode(&features()).unwrap();
        assert_eq!(caption.stop, StopReason::UnknownIndex);
        assert_eq!(caption.text, "");
    }

    #[test]
    fn test_empty_scores_are_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![], 0));
        let err = decoder(model, 5).decode(&features()).unwrap_err();
        assert!(matches!(err, PipelineError::Inference { .. }));
    }

    #[test]
    fn test_missing_sentinel_rejected() {
        let word_index: HashMap<String, u32> =
            [("a".to_string(), 1)].into_iter().collect();
        let tokenizer = Arc::new(Tokenizer::from_word_index(word_index).unwrap());
        let model = Arc::new(ScriptedModel::new(vec![], 2));
        let result = CaptionDecoder::new(model, tokenizer, &ModelConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_sentinels() {
        assert_eq!(strip_sentinels("startseq a dog endseq", "startseq", "endseq"), "a dog");
        assert_eq!(strip_sentinels("  startseq  ", "startseq", "endseq"), "");
        assert_eq!(strip_sentinels("startseq xendseqy", "startseq", "endseq"), "xy");
        assert_eq!(strip_sentinels("startstartseqseq cat", "startseq", "endseq"), "cat");
    }

    #[test]
    fn test_caption_never_contains_sentinels() {
        for script in [vec![3, 2], vec![4, 4, 4], vec![1, 1, 2], vec![2]] {
            let model = Arc::new(ScriptedModel::new(script, 8));
            let caption = decoder(model, 5).decode(&features()).unwrap();
            assert!(!caption.text.contains("startseq"));
            assert!(!caption.text.contains("endseq"));
            assert!(caption.steps <= 5);
        }
    }
}
