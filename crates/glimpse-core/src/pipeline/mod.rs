//! Upload handling stages that run before inference.
//!
//! - Validate: extension allow-list and filename sanitization
//! - Upload: persist the raw bytes under the upload directory
//! - Decode: turn bytes into an in-memory raster with limits and a timeout

pub mod decode;
pub mod upload;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use upload::UploadStore;
pub use validate::{secure_filename, UploadRejection, UploadValidator};
