//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while fetching or decoding assets
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("glTF error: {0}")]
    Gltf(#[from] ::gltf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }
}

impl From<IoError> for turntable_core::Error {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Io(io) => turntable_core::Error::Io(io),
            IoError::InvalidFormat { format } => turntable_core::Error::UnsupportedFormat(format),
            other => turntable_core::Error::InvalidData(other.to_string()),
        }
    }
}

/// Result type alias for I/O operations
pub type Result<T> = std::result::Result<T, IoError>;
