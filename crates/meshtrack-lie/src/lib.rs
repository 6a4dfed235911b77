#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use meshtrack_lie::angle_axis::angle_axis_rotate_point;
//!
//! // quarter turn around z
//! let angle_axis = DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
//! let rotated = angle_axis_rotate_point(angle_axis, DVec3::X);
//! assert!((rotated - DVec3::Y).length() < 1e-12);
//! ```

/// Angle-axis rotate-point primitive and its Jacobians.
pub mod angle_axis;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use angle_axis::{
    angle_axis_rotate_point, angle_axis_rotate_point_with_jacobians, RotatePointJacobians,
};
pub use so3::SO3;

// Re-export glam types that are used directly
pub use glam::{DMat3, DVec3};
