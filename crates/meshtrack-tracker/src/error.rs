use meshtrack_image::ImageError;
use meshtrack_optim::{OptimizerError, ProblemError};

use crate::types::DataTermErrorType;

/// An error type for the tracker module.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// Camera resolution does not match the image level it observes.
    #[error("Camera size ({0}x{1}) does not match image size ({2}x{3})")]
    CameraImageMismatch(usize, usize, usize, usize),

    /// The image level lacks a channel required by the data term.
    #[error("Data term {0:?} needs the {1} channel, which the image level does not provide")]
    MissingChannel(DataTermErrorType, &'static str),

    /// Not enough reference values for the data term.
    #[error("Data term {0:?} needs {1} reference values, got {2}")]
    MissingReference(DataTermErrorType, usize, usize),

    /// The mesh template or tracking state is inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Invalid intrinsic matrix.
    #[error("Invalid camera intrinsics: {0}")]
    InvalidCamera(String),

    /// Configuration values out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the image crate.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error while assembling the problem.
    #[error(transparent)]
    Problem(#[from] ProblemError),

    /// Error raised by the optimizer.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Error parsing the configuration.
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Error reading a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
