//! Error types for the transfer-learning pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::machine_learning::core::ModelError;

/// Errors produced while configuring, running or persisting an experiment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CvtlError {
    /// Invalid option or combination of options.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gate parameter file is malformed or too short.
    #[error("Gate parameter error: {0}")]
    Parameters(String),

    /// An array did not have the shape a stage expected.
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    Dimension {
        /// The quantity being checked.
        what: &'static str,
        /// Expected size.
        expected: usize,
        /// Size actually seen.
        actual: usize,
    },

    /// NaN, infinity or a vanishing norm appeared in the pipeline.
    #[error("Numerical instability in {stage}: {detail}")]
    NumericalInstability {
        /// Pipeline stage that detected the problem.
        stage: &'static str,
        /// Human readable description.
        detail: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by the classical model layer.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CvtlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CvtlError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type used throughout the crate.
pub type CvtlResult<T> = Result<T, CvtlError>;
