//! Camera model for projecting mesh vertices into a frame.
use glam::{DMat3, DVec3};
use meshtrack_image::ImageSize;

use crate::error::TrackerError;

/// Intrinsics of a perspective or orthographic camera observing one pyramid level.
///
/// `kk` and `inv_kk` are row-major: `kk[row][col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Intrinsic matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
    pub kk: [[f64; 3]; 3],
    /// Inverse of the intrinsic matrix
    pub inv_kk: [[f64; 3]; 3],
    /// Orthographic cameras map `(x, y, z)` straight to pixel `(x, y)`
    pub is_ortho_camera: bool,
}

/// Pixel coordinates of a projected point and their derivatives with respect to the point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Column coordinate
    pub u: f64,
    /// Row coordinate
    pub v: f64,
    /// `du/dp`
    pub du_dp: DVec3,
    /// `dv/dp`
    pub dv_dp: DVec3,
}

impl CameraInfo {
    /// Create a pinhole camera from focal lengths and principal point.
    pub fn pinhole(width: usize, height: usize, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            kk: [[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]],
            inv_kk: [
                [1.0 / fx, 0.0, -cx / fx],
                [0.0, 1.0 / fy, -cy / fy],
                [0.0, 0.0, 1.0],
            ],
            is_ortho_camera: false,
        }
    }

    /// Create an orthographic camera with identity intrinsics.
    pub fn orthographic(width: usize, height: usize) -> Self {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        Self {
            width,
            height,
            kk: identity,
            inv_kk: identity,
            is_ortho_camera: true,
        }
    }

    /// Create a camera from a 3x3 intrinsics matrix, inverting it.
    pub fn from_matrix(
        width: usize,
        height: usize,
        kk: [[f64; 3]; 3],
        is_ortho_camera: bool,
    ) -> Result<Self, TrackerError> {
        // glam is column-major, the array is row-major
        let mat = DMat3::from_cols_array_2d(&kk).transpose();
        let det = mat.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return Err(TrackerError::InvalidCamera(format!(
                "intrinsics matrix is singular (det = {det})"
            )));
        }
        let inv_kk = mat.inverse().transpose().to_cols_array_2d();

        Ok(Self {
            width,
            height,
            kk,
            inv_kk,
            is_ortho_camera,
        })
    }

    /// Size of the images this camera produces.
    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether pixel `(u, v)` lies in `[0, width) x [0, height)`.
    ///
    /// Non-finite coordinates are never inside.
    #[inline]
    pub fn is_inside(&self, u: f64, v: f64) -> bool {
        v >= 0.0 && v < self.height as f64 && u >= 0.0 && u < self.width as f64
    }

    /// Project a camera frame point to pixel coordinates.
    pub fn project(&self, p: DVec3) -> Projection {
        if self.is_ortho_camera {
            return Projection {
                u: p.x,
                v: p.y,
                du_dp: DVec3::X,
                dv_dp: DVec3::Y,
            };
        }

        let (fx, fy) = (self.kk[0][0], self.kk[1][1]);
        let (cx, cy) = (self.kk[0][2], self.kk[1][2]);
        let inv_z = 1.0 / p.z;

        Projection {
            u: p.x * fx * inv_z + cx,
            v: p.y * fy * inv_z + cy,
            du_dp: DVec3::new(fx * inv_z, 0.0, -fx * p.x * inv_z * inv_z),
            dv_dp: DVec3::new(0.0, fy * inv_z, -fy * p.y * inv_z * inv_z),
        }
    }

    /// Ray direction `(x/z, y/z)` through pixel `(u, v)`, from the diagonal of `inv_kk`.
    #[inline]
    pub fn back_project_ray(&self, u: f64, v: f64) -> (f64, f64) {
        (
            self.inv_kk[0][0] * u + self.inv_kk[0][2],
            self.inv_kk[1][1] * v + self.inv_kk[1][2],
        )
    }
}
