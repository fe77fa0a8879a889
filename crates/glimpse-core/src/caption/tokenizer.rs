//! Word-level tokenizer built at training time.
//!
//! Reads the JSON written by Keras' `Tokenizer.to_json()` (where
//! `config.word_index` is itself a JSON-encoded string) or a plain
//! `{"word_index": {...}}` object, and reproduces `texts_to_sequences` and
//! `pad_sequences` so the decoder sees exactly what it was trained on.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;

/// Default Keras filter set: punctuation, tab and newline.
const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Padding index; never assigned to a word.
pub const PAD_INDEX: u32 = 0;

/// `word_index` is either an object or a JSON string containing one.
#[derive(Deserialize)]
#[serde(untagged)]
enum WordIndexField {
    Map(HashMap<String, u32>),
    Encoded(String),
}

#[derive(Deserialize)]
struct TokenizerSettings {
    word_index: WordIndexField,
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default = "default_filters")]
    filters: String,
    #[serde(default = "default_lower")]
    lower: bool,
    #[serde(default = "default_split")]
    split: String,
    #[serde(default)]
    oov_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenizerFile {
    Keras { config: TokenizerSettings },
    Plain(TokenizerSettings),
}

fn default_filters() -> String {
    DEFAULT_FILTERS.to_string()
}

fn default_lower() -> bool {
    true
}

fn default_split() -> String {
    " ".to_string()
}

/// Bidirectional word ↔ index mapping, immutable after load.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    word_index: HashMap<String, u32>,
    index_word: HashMap<u32, String>,
    num_words: Option<usize>,
    filters: String,
    lower: bool,
    split: String,
    oov_index: Option<u32>,
}

impl Tokenizer {
    /// Load a tokenizer from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::Model {
                message: format!(
                    "Tokenizer not found at {:?}. Check `glimpse models list`.",
                    path
                ),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read {:?}: {}", path, e),
        })?;
        let tokenizer = Self::from_json(&content)?;
        tracing::info!(
            "Loaded tokenizer from {:?}: {} words",
            path,
            tokenizer.vocab_size()
        );
        Ok(tokenizer)
    }

    /// Parse a tokenizer from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let file: TokenizerFile = serde_json::from_str(json).map_err(|e| PipelineError::Model {
            message: format!("Malformed tokenizer JSON: {e}"),
        })?;
        let settings = match file {
            TokenizerFile::Keras { config } => config,
            TokenizerFile::Plain(settings) => settings,
        };

        let word_index = match settings.word_index {
            WordIndexField::Map(map) => map,
            WordIndexField::Encoded(encoded) => {
                serde_json::from_str(&encoded).map_err(|e| PipelineError::Model {
                    message: format!("Malformed tokenizer word_index: {e}"),
                })?
            }
        };

        let mut tokenizer = Self::from_word_index(word_index)?;
        // Keras treats a zero cap as no cap
        tokenizer.num_words = settings.num_words.filter(|&n| n > 0);
        tokenizer.filters = settings.filters;
        tokenizer.lower = settings.lower;
        tokenizer.split = settings.split;
        tokenizer.oov_index = match settings.oov_token {
            Some(token) => Some(*tokenizer.word_index.get(&token).ok_or_else(|| {
                PipelineError::Model {
                    message: format!("OOV token {token:?} missing from word_index"),
                }
            })?),
            None => None,
        };
        if tokenizer.split.is_empty() {
            return Err(PipelineError::Model {
                message: "Tokenizer split string must not be empty".to_string(),
            });
        }
        Ok(tokenizer)
    }

    /// Build a tokenizer with Keras defaults from a word → index map.
    ///
    /// The inverse map is built once here. Index 0 is reserved for padding
    /// and each index may belong to exactly one word.
    pub fn from_word_index(word_index: HashMap<String, u32>) -> Result<Self, PipelineError> {
        let mut index_word = HashMap::with_capacity(word_index.len());
        for (word, &index) in &word_index {
            if index == PAD_INDEX {
                return Err(PipelineError::Model {
                    message: format!("Word {word:?} uses reserved padding index 0"),
                });
            }
            if let Some(existing) = index_word.insert(index, word.clone()) {
                return Err(PipelineError::Model {
                    message: format!(
                        "Tokenizer maps index {index} to both {existing:?} and {word:?}"
                    ),
                });
            }
        }

        Ok(Self {
            word_index,
            index_word,
            num_words: None,
            filters: DEFAULT_FILTERS.to_string(),
            lower: true,
            split: " ".to_string(),
            oov_index: None,
        })
    }

    /// Number of words in the vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.word_index.len()
    }

    /// Index of a word, if known.
    pub fn index_of(&self, word: &str) -> Option<u32> {
        self.word_index.get(word).copied()
    }

    /// Word at an index, if any.
    pub fn word_at(&self, index: u32) -> Option<&str> {
        self.index_word.get(&index).map(String::as_str)
    }

    /// Split text into words the way the tokenizer was fitted.
    pub fn split_words(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let translated: String = text
            .chars()
            .map(|c| {
                if self.filters.contains(c) {
                    self.split.clone()
                } else {
                    c.to_string()
                }
            })
            .collect();
        translated
            .split(self.split.as_str())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Encode text into indices, dropping unknown words unless an OOV token
    /// is configured and honouring the `num_words` cap.
    pub fn texts_to_sequence(&self, text: &str) -> Vec<u32> {
        let mut sequence = Vec::new();
        for word in self.split_words(text) {
            match self.word_index.get(&word) {
                Some(&index) => {
                    let capped = self.num_words.is_some_and(|n| index as usize >= n);
                    if !capped {
                        sequence.push(index);
                    } else if let Some(oov) = self.oov_index {
                        sequence.push(oov);
                    }
                }
                None => {
                    if let Some(oov) = self.oov_index {
                        sequence.push(oov);
                    }
                }
            }
        }
        sequence
    }
}

/// Left-pad (or left-truncate) a sequence to exactly `max_length` entries.
pub fn pad_sequence(sequence: &[u32], max_length: usize) -> Vec<u32> {
    if sequence.len() >= max_length {
        return sequence[sequence.len() - max_length..].to_vec();
    }
    let mut padded = vec![PAD_INDEX; max_length - sequence.len()];
    padded.extend_from_slice(sequence);
    padded
}
