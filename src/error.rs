//! Error type shared by the integration core and the I/O adapters.
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating inputs or reading/writing files.
///
/// Solver-side numerical trouble (CG stopping short of its tolerance, a prior
/// without usable residuals) is reported through diagnostics, not here.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Inputs are inconsistent or unusable (shapes, empty mask, intrinsics,
    /// parameters, prior values).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image codec failed for {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("JSON failed for {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A text file did not have the expected layout.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl IntegrationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
