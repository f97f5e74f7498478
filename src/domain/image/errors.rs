//! Image Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Image is empty")]
    Empty,

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}
