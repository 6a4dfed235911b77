//! SO(3) stored as a unit quaternion.
//!
//! Tangent vectors are axis-angle vectors: the direction is the rotation axis, the
//! magnitude the angle in radians. `exp` and the left Jacobian fall back to their Taylor
//! expansion for small angles (θ < 1e-8).

use glam::{DMat3, DQuat, DVec3};

const SMALL_ANGLE_EPSILON: f64 = 1.0e-8;

/// A 3D rotation, stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3 {
    /// The unit quaternion.
    pub q: DQuat,
}

impl SO3 {
    /// The rotation matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_quat(self.q)
    }

    /// Lie algebra -> Lie group
    pub fn exp(v: DVec3) -> Self {
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();
        let theta_half = 0.5 * theta;

        let (w, b) = if theta < SMALL_ANGLE_EPSILON {
            // taylor expansion of cos(x/2) and sin(x/2)/x around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            (theta_half.cos(), theta_half.sin() / theta)
        };

        let xyz = b * v;

        Self {
            q: DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w),
        }
    }

    /// Vector space -> Lie algebra, `hat(a) * b == a.cross(b)`.
    pub fn hat(v: DVec3) -> DMat3 {
        let (a, b, c) = (v.x, v.y, v.z);
        DMat3::from_cols_array(&[0.0, c, -b, -c, 0.0, a, b, -a, 0.0])
    }

    /// Left Jacobian of the exponential map: `exp(v + d) ≈ exp(Jl(v) d) * exp(v)`.
    pub fn left_jacobian(v: DVec3) -> DMat3 {
        let skew = Self::hat(v);
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();

        let (a, b) = if theta < SMALL_ANGLE_EPSILON {
            (0.5 - theta_sq / 24.0, 1.0 / 6.0 - theta_sq / 120.0)
        } else {
            (
                (1.0 - theta.cos()) / theta_sq,
                (theta - theta.sin()) / (theta_sq * theta),
            )
        };

        DMat3::IDENTITY + a * skew + b * (skew * skew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: &DMat3, b: &DMat3, epsilon: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a.col(i)[j], b.col(i)[j], epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_exp_zero_is_identity() {
        assert_mat_eq(&SO3::exp(DVec3::ZERO).matrix(), &DMat3::IDENTITY, 1e-12);
        assert_mat_eq(
            &SO3::exp(DVec3::new(1e-10, 0.0, 0.0)).matrix(),
            &DMat3::IDENTITY,
            1e-9,
        );
    }

    #[test]
    fn test_exp_quarter_turn() {
        let r = SO3::exp(DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2)).matrix();
        let p = r * DVec3::X;
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hat_is_cross_product() {
        let v = DVec3::new(1.0, 2.0, 3.0);
        let w = DVec3::new(-0.5, 4.0, 0.25);
        let hat_w = SO3::hat(v) * w;
        let cross = v.cross(w);
        assert_relative_eq!(hat_w.x, cross.x);
        assert_relative_eq!(hat_w.y, cross.y);
        assert_relative_eq!(hat_w.z, cross.z);
    }

    #[test]
    fn test_left_jacobian_first_order() {
        let v = DVec3::new(0.2, -0.4, 0.1);
        let d = DVec3::new(1e-6, -2e-6, 0.5e-6);

        // exp(v + d) ≈ exp(Jl d) exp(v)
        let lhs = SO3::exp(v + d).matrix();
        let rhs = SO3::exp(SO3::left_jacobian(v) * d).matrix() * SO3::exp(v).matrix();
        assert_mat_eq(&lhs, &rhs, 1e-10);
    }

    #[test]
    fn test_jacobian_keeps_axis() {
        for v in [DVec3::new(0.1, 0.2, 0.3), DVec3::new(1e-9, 0.0, 2e-9)] {
            let jl = SO3::left_jacobian(v);
            assert!(jl.is_finite());
            let out = jl * v;
            assert_relative_eq!(out.x, v.x, epsilon = 1e-12);
            assert_relative_eq!(out.y, v.y, epsilon = 1e-12);
            assert_relative_eq!(out.z, v.z, epsilon = 1e-12);
        }
    }
}
