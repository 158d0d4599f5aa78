//! Error types for the hannom-core library.

use thiserror::Error;

/// Main error type for the hannom library.
#[derive(Error, Debug)]
pub enum HannomError {
    /// Box geometry error.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Pipeline collaborator error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by box geometry.
///
/// Boxes only partially outside the page are clipped and never produce this.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Degenerate, self-intersecting, non-finite or off-page geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl GeometryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        GeometryError::InvalidGeometry(reason.into())
    }
}

/// Errors reported by the external collaborators of the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Text detection failed.
    #[error("text detection failed: {0}")]
    Detection(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// A translation service failed.
    #[error("translation via {service} failed: {reason}")]
    Translation { service: String, reason: String },

    /// The pipeline was built without a required component.
    #[error("no {0} configured")]
    MissingComponent(&'static str),
}

/// Result type for the hannom library.
pub type Result<T> = std::result::Result<T, HannomError>;
