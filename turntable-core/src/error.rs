//! Error types for turntable

use thiserror::Error;

/// Boxed underlying cause of a failed load
pub type LoadCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for turntable operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),

    #[error("Render surface unavailable: {0}")]
    RenderSurface(String),

    #[error("Object has an empty bounding volume")]
    EmptyGeometry,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

/// A model or environment asset could not be fetched or decoded.
///
/// Always contained where it occurs: the asset is left out of the navigable
/// set (or the environment is skipped) and the viewer carries on.
#[derive(Error, Debug)]
#[error("failed to load '{asset}' from {uri}: {cause}")]
pub struct AssetLoadError {
    /// Descriptor id, or `environment` for the lighting probe
    pub asset: String,
    pub uri: String,
    #[source]
    pub cause: LoadCause,
}

impl AssetLoadError {
    pub fn new(asset: impl Into<String>, uri: impl Into<String>, cause: impl Into<LoadCause>) -> Self {
        Self {
            asset: asset.into(),
            uri: uri.into(),
            cause: cause.into(),
        }
    }
}

/// Result type alias for turntable operations
pub type Result<T> = std::result::Result<T, Error>;
