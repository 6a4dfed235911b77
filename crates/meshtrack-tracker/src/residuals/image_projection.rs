use glam::DVec3;
use meshtrack_image::{GradientImage, Sample};
use meshtrack_lie::angle_axis_rotate_point_with_jacobians;
use meshtrack_optim::{
    check_params, Factor, FactorError, FactorResult, LinearizationResult, RobustLoss,
};

use super::vec3;
use crate::camera::CameraInfo;
use crate::error::TrackerError;
use crate::level::ImageLevel;
use crate::types::{DataLoss, DataTermErrorType};

/// Number of Jacobian columns: rotation, translation and point.
const NUM_COLS: usize = 9;

/// Derivative of a scalar with respect to `[rotation(3) | translation(3) | xyz(3)]`.
type Gradient = [f64; NUM_COLS];

fn scaled(g: &Gradient, s: f64) -> Gradient {
    g.map(|x| x * s)
}

fn add(a: &Gradient, b: &Gradient) -> Gradient {
    std::array::from_fn(|i| a[i] + b[i])
}

fn unit(col: usize) -> Gradient {
    let mut g = [0.0; NUM_COLS];
    g[col] = 1.0;
    g
}

/// Data term of a mesh vertex projected into one image level.
///
/// The vertex `xyz` is moved by the rigid motion `p = R(rotation) xyz + translation` and
/// projected with the camera. Points landing outside `[0, width) x [0, height)` contribute a
/// zero residual and a zero Jacobian.
///
/// Parameters: `[rotation(3), translation(3), xyz(3)]`. The residual size is given by
/// [`DataTermErrorType::residual_num`]:
///
/// - `Intensity`: `weight * (I(u, v) - reference[0])`
/// - `Color`: `weight * (C_i(u, v) - reference[i])`
/// - `Depth` (point-to-point): with `d = D(u, v) - xyz.z`, `[weight * d, 0, 0]` for an
///   orthographic camera and `[d * ray_x, d * ray_y, d]` for a perspective one
/// - `DepthPlane` (point-to-plane): `n(u, v) . (xyz - D(u, v) * (ray_x, ray_y, 1))`
///
/// The perspective depth terms are not weighted.
#[derive(Debug, Clone, Copy)]
pub struct ResidualImageProjection<'a> {
    weight: f64,
    reference: Option<&'a [f64]>,
    camera: &'a CameraInfo,
    level: &'a ImageLevel,
    error_type: DataTermErrorType,
    loss: DataLoss,
}

impl<'a> ResidualImageProjection<'a> {
    /// Create a data term without reference values, for the depth error types.
    ///
    /// # Errors
    ///
    /// Fails when the camera and the gray image of `level` have different sizes, when the level
    /// misses a channel the error type reads, or when the error type needs reference values.
    pub fn new(
        weight: f64,
        camera: &'a CameraInfo,
        level: &'a ImageLevel,
        error_type: DataTermErrorType,
    ) -> Result<Self, TrackerError> {
        let size = level.size();
        if camera.width != size.width || camera.height != size.height {
            return Err(TrackerError::CameraImageMismatch(
                camera.width,
                camera.height,
                size.width,
                size.height,
            ));
        }
        Self::check_channels(level, error_type)?;
        if error_type.reference_num() > 0 {
            return Err(TrackerError::MissingReference(
                error_type,
                error_type.reference_num(),
                0,
            ));
        }

        Ok(Self {
            weight,
            reference: None,
            camera,
            level,
            error_type,
            loss: DataLoss::Quadratic,
        })
    }

    /// Create a data term comparing against the given reference values.
    ///
    /// # Errors
    ///
    /// Fails when the level misses a channel the error type reads or when `reference` is
    /// shorter than [`DataTermErrorType::reference_num`].
    pub fn with_reference(
        weight: f64,
        reference: &'a [f64],
        camera: &'a CameraInfo,
        level: &'a ImageLevel,
        error_type: DataTermErrorType,
    ) -> Result<Self, TrackerError> {
        Self::check_channels(level, error_type)?;
        if reference.len() < error_type.reference_num() {
            return Err(TrackerError::MissingReference(
                error_type,
                error_type.reference_num(),
                reference.len(),
            ));
        }

        Ok(Self {
            weight,
            reference: Some(reference),
            camera,
            level,
            error_type,
            loss: DataLoss::Quadratic,
        })
    }

    /// Robustify the term with `loss`.
    pub fn with_loss(mut self, loss: DataLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn error_type(&self) -> DataTermErrorType {
        self.error_type
    }

    fn check_channels(
        level: &ImageLevel,
        error_type: DataTermErrorType,
    ) -> Result<(), TrackerError> {
        let missing = match error_type {
            DataTermErrorType::Intensity => None,
            DataTermErrorType::Color => level.color().is_none().then_some("color"),
            DataTermErrorType::Depth => level.depth().is_none().then_some("depth"),
            DataTermErrorType::DepthPlane => {
                if level.depth().is_none() {
                    Some("depth")
                } else if level.depth_normals().is_none() {
                    Some("depth normal")
                } else {
                    None
                }
            }
        };
        match missing {
            Some(channel) => Err(TrackerError::MissingChannel(error_type, channel)),
            None => Ok(()),
        }
    }

    fn reference(&self, i: usize) -> f64 {
        self.reference.map_or(0.0, |r| r[i])
    }
}

/// Projected pixel and the derivatives of its coordinates with respect to the parameters.
struct PixelJacobian {
    u: f64,
    v: f64,
    du: Gradient,
    dv: Gradient,
}

impl PixelJacobian {
    /// Derivative of an image sample with respect to the parameters.
    fn chain(&self, sample: &Sample) -> Gradient {
        add(&scaled(&self.du, sample.du), &scaled(&self.dv, sample.dv))
    }
}

fn sample_channel(image: Option<&GradientImage>, u: f64, v: f64) -> FactorResult<Sample> {
    image
        .map(|im| im.sample(u, v))
        .ok_or_else(|| FactorError::MissingInput("image channel not available".into()))
}

impl Factor for ResidualImageProjection<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3, 3])?;
        let num_residuals = self.error_type.residual_num();
        let mut residual = vec![0.0; num_residuals];
        let mut rows: Vec<Gradient> = vec![[0.0; NUM_COLS]; num_residuals];

        let xyz = vec3(params[2]);
        let motion = angle_axis_rotate_point_with_jacobians(vec3(params[0]), xyz);
        let p = motion.rotated + vec3(params[1]);
        let projection = self.camera.project(p);

        if self.camera.is_inside(projection.u, projection.v) {
            let to_params = |g: DVec3| -> Gradient {
                let d_rot = motion.d_angle_axis.transpose() * g;
                let d_xyz = motion.d_point.transpose() * g;
                [
                    d_rot.x, d_rot.y, d_rot.z, g.x, g.y, g.z, d_xyz.x, d_xyz.y, d_xyz.z,
                ]
            };
            let pixel = PixelJacobian {
                u: projection.u,
                v: projection.v,
                du: to_params(projection.du_dp),
                dv: to_params(projection.dv_dp),
            };
            self.evaluate_inside(&pixel, xyz, &mut residual, &mut rows)?;
        }

        let jacobian = compute_jacobian.then(|| rows.concat());
        Ok(LinearizationResult::new(residual, jacobian, NUM_COLS))
    }

    fn residual_dim(&self) -> usize {
        self.error_type.residual_num()
    }

    fn num_variables(&self) -> usize {
        3
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }

    fn get_loss(&self) -> Option<&dyn RobustLoss> {
        Some(&self.loss)
    }
}

impl ResidualImageProjection<'_> {
    fn evaluate_inside(
        &self,
        pixel: &PixelJacobian,
        xyz: DVec3,
        residual: &mut [f64],
        rows: &mut [Gradient],
    ) -> FactorResult<()> {
        let (u, v) = (pixel.u, pixel.v);
        let level = self.level;

        match self.error_type {
            DataTermErrorType::Intensity => {
                let s = level.gray().sample(u, v);
                residual[0] = self.weight * (s.value - self.reference(0));
                rows[0] = scaled(&pixel.chain(&s), self.weight);
            }
            DataTermErrorType::Color => {
                for i in 0..3 {
                    let s = sample_channel(level.color().map(|c| &c[i]), u, v)?;
                    residual[i] = self.weight * (s.value - self.reference(i));
                    rows[i] = scaled(&pixel.chain(&s), self.weight);
                }
            }
            DataTermErrorType::Depth => {
                let s = sample_channel(level.depth(), u, v)?;
                let d = s.value - xyz.z;
                let dd = add(&pixel.chain(&s), &scaled(&unit(8), -1.0));

                if self.camera.is_ortho_camera {
                    residual[0] = self.weight * d;
                    rows[0] = scaled(&dd, self.weight);
                } else {
                    let (ray_x, ray_y) = self.camera.back_project_ray(u, v);
                    let d_ray_x = scaled(&pixel.du, self.camera.inv_kk[0][0]);
                    let d_ray_y = scaled(&pixel.dv, self.camera.inv_kk[1][1]);

                    residual[0] = d * ray_x;
                    residual[1] = d * ray_y;
                    residual[2] = d;
                    rows[0] = add(&scaled(&dd, ray_x), &scaled(&d_ray_x, d));
                    rows[1] = add(&scaled(&dd, ray_y), &scaled(&d_ray_y, d));
                    rows[2] = dd;
                }
            }
            DataTermErrorType::DepthPlane => {
                let depth = sample_channel(level.depth(), u, v)?;
                let (ray_x, ray_y) = self.camera.back_project_ray(u, v);
                let d_depth = pixel.chain(&depth);
                let d_ray_x = scaled(&pixel.du, self.camera.inv_kk[0][0]);
                let d_ray_y = scaled(&pixel.dv, self.camera.inv_kk[1][1]);

                let back_projection = [depth.value * ray_x, depth.value * ray_y, depth.value];
                let d_back_projection = [
                    add(&scaled(&d_depth, ray_x), &scaled(&d_ray_x, depth.value)),
                    add(&scaled(&d_depth, ray_y), &scaled(&d_ray_y, depth.value)),
                    d_depth,
                ];

                let mut row = [0.0; NUM_COLS];
                for i in 0..3 {
                    let normal =
                        sample_channel(level.depth_normals().map(|n| &n[i]), u, v)?;
                    let offset = xyz[i] - back_projection[i];
                    residual[0] += normal.value * offset;

                    // d(n_i * (xyz_i - bp_i)) = dn_i * offset + n_i * (e_xyz_i - dbp_i)
                    let d_offset = add(&unit(6 + i), &scaled(&d_back_projection[i], -1.0));
                    row = add(&row, &scaled(&pixel.chain(&normal), offset));
                    row = add(&row, &scaled(&d_offset, normal.value));
                }
                rows[0] = row;
            }
        }
        Ok(())
    }
}
