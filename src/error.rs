//! Top-level error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::traits::DeviceError;
use crate::video::EncodingError;

/// Any failure that ends a timelapse run or a step of it.
#[derive(Debug, Error)]
pub enum TimelapseError {
    /// Bad configuration or unknown platform identifier, caught before any
    /// device is touched.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// Camera failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Video assembly failure.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The output directory could not be prepared.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl TimelapseError {
    /// Shorthand for a validation error.
    pub fn validation<M: Into<String>>(msg: M) -> Self {
        Self::Validation(msg.into())
    }
}
