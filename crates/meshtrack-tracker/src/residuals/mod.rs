//! Residual terms of the tracking energy.
//!
//! Each term implements [`meshtrack_optim::Factor`] and returns its residual together with an
//! analytic row-major Jacobian. Reference data (template vertices, previous motion, images) is
//! borrowed for the lifetime of the problem and never copied.

mod arap;
mod deform;
mod image_projection;
mod regularization;
mod temporal_motion;

pub use arap::ResidualArap;
pub use deform::ResidualDeform;
pub use image_projection::ResidualImageProjection;
pub use regularization::{ResidualInextent, ResidualRotTV, ResidualTV};
pub use temporal_motion::ResidualTemporalMotion;

use glam::{DMat3, DVec3};

/// Write `m` scaled by `scale` into the 3x3 block at (`row0`, `col0`) of a row-major Jacobian.
#[inline]
pub(crate) fn write_block(
    jacobian: &mut [f64],
    num_cols: usize,
    row0: usize,
    col0: usize,
    m: DMat3,
    scale: f64,
) {
    for r in 0..3 {
        let row = m.row(r) * scale;
        let start = (row0 + r) * num_cols + col0;
        jacobian[start..start + 3].copy_from_slice(&row.to_array());
    }
}

/// Write `scale * I` into the 3x3 block at (`row0`, `col0`).
#[inline]
pub(crate) fn write_scaled_identity(
    jacobian: &mut [f64],
    num_cols: usize,
    row0: usize,
    col0: usize,
    scale: f64,
) {
    write_block(jacobian, num_cols, row0, col0, DMat3::IDENTITY, scale);
}

#[inline]
pub(crate) fn vec3(values: &[f64]) -> DVec3 {
    DVec3::from_slice(values)
}
