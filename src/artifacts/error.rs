//! Error types raised by artifact loading and by the loaded estimators

use std::path::PathBuf;

/// Result type for artifact loading
pub type ArtifactResult<T> = std::result::Result<T, StartupArtifactError>;

/// Failures while bringing an artifact into memory at startup.
///
/// These never abort the process; the loader records them and the service
/// stays degraded.
#[derive(Debug, thiserror::Error)]
pub enum StartupArtifactError {
    /// Artifact file does not exist
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Artifact exists but could not be read
    #[error("Failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact bytes could not be deserialized
    #[error("Corrupt artifact {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// Model and scaler were fitted on different feature widths
    #[error("Incompatible artifacts: scaler expects {scaler} features, model expects {model}")]
    Incompatible { scaler: usize, model: usize },
}

/// Failures raised by a scaler while transforming a sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Input width differs from the fitted width
    #[error("X has {got} features, but the scaler is expecting {expected} features as input")]
    DimensionMismatch { expected: usize, got: usize },

    /// Input contains NaN or infinity
    #[error("Input contains NaN or infinity at feature index {index}")]
    NonFinite { index: usize },

    /// Scaler parameters are unusable
    #[error("Invalid scaler parameters: {0}")]
    InvalidParameters(String),
}

/// Failures raised by a model while predicting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    /// Input width differs from what the model was trained on
    #[error("X has {got} features, but the model is expecting {expected} features as input")]
    DimensionMismatch { expected: usize, got: usize },

    /// Model produced a value that cannot be represented on the wire
    #[error("Model produced a non-finite output")]
    NonFiniteOutput,

    /// Model returned a number of rows different from the input
    #[error("Model returned {got} predictions for {expected} samples")]
    RowCountMismatch { expected: usize, got: usize },

    /// Estimator-specific failure
    #[error("Model failure: {0}")]
    Estimator(String),
}
