//! Error types for experiment runs.

use thiserror::Error;

/// Everything that can abort an experiment, an iteration, or a single pass.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Bad dataset layout or invalid configuration values. Raised before any
    /// iteration starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resume was requested but no checkpoint exists for the run key.
    #[error("No checkpoint found for run '{name}' with seed {seed}")]
    MissingCheckpoint { name: String, seed: u64 },

    /// Requested compute device is not available. Callers fall back to the
    /// CPU path and only log this.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Tensor or batch dimensions do not line up.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ExperimentError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
