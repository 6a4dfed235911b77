#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The tracking energy of a frame is a sum of residual terms over the vertices and edges of a
//! template mesh:
//!
//! - a data term projecting every vertex into the frame ([`ResidualImageProjection`]),
//! - edge regularizers ([`ResidualTV`], [`ResidualRotTV`], [`ResidualInextent`],
//!   [`ResidualArap`]),
//! - a vertex anchor ([`ResidualDeform`]) and a temporal prior on the rigid motion
//!   ([`ResidualTemporalMotion`]).
//!
//! [`MeshTracker`] assembles these into a [`meshtrack_optim::Problem`] and solves it, logging
//! the energy of every iteration with an [`EnergyCallback`].
//!
//! # Example
//!
//! ```
//! use meshtrack_optim::Factor;
//! use meshtrack_tracker::ResidualTV;
//!
//! let (vertex, neighbor) = ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
//! let tv = ResidualTV::new(2.0, &vertex, &neighbor);
//! let result = tv.linearize(&[&[0.0, 0.0, 0.0], &[2.0, 0.0, 0.0]], false).unwrap();
//! assert_eq!(result.residual, vec![2.0, 0.0, 0.0]);
//! ```

/// Camera intrinsics and projection.
pub mod camera;

/// Tracking configuration.
pub mod config;

/// Per iteration energy recording.
pub mod energy;

/// Error types for the tracker module.
pub mod error;

/// Image pyramid level with gradients.
pub mod level;

/// Residual terms.
pub mod residuals;

/// Problem assembly for one frame.
pub mod tracking;

/// Data term and bundle adjustment selectors.
pub mod types;

pub use camera::{CameraInfo, Projection};
pub use config::TrackerConfig;
pub use energy::EnergyCallback;
pub use error::TrackerError;
pub use level::ImageLevel;
pub use residuals::{
    ResidualArap, ResidualDeform, ResidualImageProjection, ResidualInextent, ResidualRotTV,
    ResidualTV, ResidualTemporalMotion,
};
pub use tracking::{MeshTemplate, MeshTracker, RigidMotion, TrackingState, TrackingSummary};
pub use types::{BaType, DataLoss, DataTermErrorType};
