use glam::{DMat3, DVec3};

use crate::so3::SO3;

/// Rotate `point` by the rotation encoded in the axis-angle vector `angle_axis`.
///
/// Uses Rodrigues' formula. Near the identity the first order expansion
/// `point + angle_axis x point` is used instead, which stays exact in value and derivative
/// at zero.
pub fn angle_axis_rotate_point(angle_axis: DVec3, point: DVec3) -> DVec3 {
    let theta_sq = angle_axis.length_squared();
    if theta_sq > f64::EPSILON {
        let theta = theta_sq.sqrt();
        let w = angle_axis / theta;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let w_cross_pt = w.cross(point);
        let tmp = w.dot(point) * (1.0 - cos_theta);

        point * cos_theta + w_cross_pt * sin_theta + w * tmp
    } else {
        point + angle_axis.cross(point)
    }
}

/// A rotated point together with its derivatives.
#[derive(Debug, Clone, Copy)]
pub struct RotatePointJacobians {
    /// `R(angle_axis) * point`
    pub rotated: DVec3,
    /// Derivative of the rotated point with respect to the axis-angle vector.
    pub d_angle_axis: DMat3,
    /// Derivative of the rotated point with respect to the point, i.e. the rotation matrix.
    pub d_point: DMat3,
}

/// Rotate `point` by `angle_axis` and return the Jacobians of the result.
///
/// With `q = R(w) p`, `dq/dw = -[q]x Jl(w)` where `Jl` is the left Jacobian of SO(3).
pub fn angle_axis_rotate_point_with_jacobians(
    angle_axis: DVec3,
    point: DVec3,
) -> RotatePointJacobians {
    let rotated = angle_axis_rotate_point(angle_axis, point);
    let d_angle_axis = -SO3::hat(rotated) * SO3::left_jacobian(angle_axis);
    RotatePointJacobians {
        rotated,
        d_angle_axis,
        d_point: SO3::exp(angle_axis).matrix(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: DVec3, b: DVec3, epsilon: f64) {
        assert_relative_eq!(a.x, b.x, epsilon = epsilon);
        assert_relative_eq!(a.y, b.y, epsilon = epsilon);
        assert_relative_eq!(a.z, b.z, epsilon = epsilon);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let aa = DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        assert_vec_eq(angle_axis_rotate_point(aa, DVec3::X), DVec3::Y, 1e-12);
        assert_vec_eq(angle_axis_rotate_point(aa, DVec3::Z), DVec3::Z, 1e-12);
    }

    #[test]
    fn test_rotate_matches_so3() {
        let aa = DVec3::new(0.4, -0.3, 1.1);
        let p = DVec3::new(0.5, 2.0, -1.0);
        assert_vec_eq(
            angle_axis_rotate_point(aa, p),
            SO3::exp(aa).matrix() * p,
            1e-12,
        );
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let p = DVec3::new(3.0, -1.0, 2.0);
        assert_eq!(angle_axis_rotate_point(DVec3::ZERO, p), p);
    }

    #[test]
    fn test_jacobians_match_finite_differences() {
        let h = 1e-6;
        let points = [DVec3::new(0.5, 2.0, -1.0), DVec3::new(-0.2, 0.1, 3.0)];
        let rotations = [DVec3::new(0.4, -0.3, 1.1), DVec3::ZERO];

        for aa in rotations {
            for p in points {
                let jac = angle_axis_rotate_point_with_jacobians(aa, p);
                for k in 0..3 {
                    let mut step = DVec3::ZERO;
                    step[k] = h;

                    let numeric = (angle_axis_rotate_point(aa + step, p)
                        - angle_axis_rotate_point(aa - step, p))
                        / (2.0 * h);
                    assert_vec_eq(jac.d_angle_axis.col(k), numeric, 1e-6);

                    let numeric = (angle_axis_rotate_point(aa, p + step)
                        - angle_axis_rotate_point(aa, p - step))
                        / (2.0 * h);
                    assert_vec_eq(jac.d_point.col(k), numeric, 1e-6);
                }
            }
        }
    }
}
