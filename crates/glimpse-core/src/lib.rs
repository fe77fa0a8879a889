//! Glimpse Core - image captioning and account library.
//!
//! Glimpse turns an uploaded image into a short English caption and keeps a
//! minimal table of user accounts for the web service built on top of it.
//!
//! # Architecture
//!
//! ```text
//! Upload → Validate → Save → Decode → Features (backbone) → Greedy decode → Caption
//! ```
//!
//! All model artifacts are loaded once into a [`Captioner`] and shared
//! read-only afterwards.
//!
//! # Usage
//!
//! ```rust,ignore
//! use glimpse_core::{Captioner, Config, ImageDecoder};
//!
//! fn main() -> glimpse_core::Result<()> {
//!     let config = Config::load()?;
//!     let captioner = Captioner::load(&config)?;
//!
//!     let rt = tokio::runtime::Runtime::new()?;
//!     let decoded = rt.block_on(ImageDecoder::new(config.limits.clone()).decode("dog.jpg".as_ref()))?;
//!     println!("{}", captioner.caption(&decoded.image)?.text);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod accounts;
pub mod caption;
pub mod config;
pub mod error;
pub mod features;
pub mod math;
pub mod pipeline;

// Re-exports for convenient access
pub use accounts::{AccountStore, UserAccount};
pub use caption::{Caption, CaptionDecoder, Captioner, StopReason, Tokenizer};
pub use config::Config;
pub use error::{AccountError, ConfigError, GlimpseError, PipelineError, PipelineResult, Result};
pub use features::{FeatureExtractor, ImageFeatures};
pub use pipeline::{ImageDecoder, UploadRejection, UploadStore, UploadValidator};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
