//! Error types for fitting, scoring, calibration and persistence.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AnomalyError>;

#[derive(Error, Debug)]
pub enum AnomalyError {
    /// Empty or malformed matrix, bad labels, or an out-of-range setting
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model not fitted")]
    ModelNotFitted,

    /// Raised only when the estimator is configured to reject zero-variance features
    #[error("degenerate distribution: zero variance in feature(s) {features:?}")]
    DegenerateDistribution { features: Vec<usize> },

    #[error("unsupported model record version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnomalyError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AnomalyError::InvalidInput(msg.into())
    }
}
