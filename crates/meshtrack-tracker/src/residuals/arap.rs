use meshtrack_lie::angle_axis_rotate_point_with_jacobians;
use meshtrack_optim::{check_params, Factor, FactorResult, LinearizationResult};

use super::{vec3, write_block, write_scaled_identity};

/// As-rigid-as-possible term.
///
/// The template edge rotated by the vertex's local rotation should match the current edge:
/// `r = weight * ((current_vertex - current_neighbor) - R(local_rotation) (vertex - neighbor))`.
///
/// Parameters: `[current_vertex(3), current_neighbor(3), local_rotation(3)]`, where the local
/// rotation maps the template onto the current mesh.
#[derive(Debug, Clone, Copy)]
pub struct ResidualArap<'a> {
    weight: f64,
    vertex: &'a [f64; 3],
    neighbor: &'a [f64; 3],
}

impl<'a> ResidualArap<'a> {
    pub fn new(weight: f64, vertex: &'a [f64; 3], neighbor: &'a [f64; 3]) -> Self {
        Self {
            weight,
            vertex,
            neighbor,
        }
    }
}

impl Factor for ResidualArap<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3, 3])?;
        let template_diff = vec3(self.vertex) - vec3(self.neighbor);
        let current_diff = vec3(params[0]) - vec3(params[1]);
        let rotated = angle_axis_rotate_point_with_jacobians(vec3(params[2]), template_diff);

        let residual = (current_diff - rotated.rotated) * self.weight;

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 3 * 9];
            write_scaled_identity(&mut jac, 9, 0, 0, self.weight);
            write_scaled_identity(&mut jac, 9, 0, 3, -self.weight);
            write_block(&mut jac, 9, 0, 6, rotated.d_angle_axis, -self.weight);
            jac
        });

        Ok(LinearizationResult::new(
            residual.to_array().to_vec(),
            jacobian,
            9,
        ))
    }

    fn residual_dim(&self) -> usize {
        3
    }

    fn num_variables(&self) -> usize {
        3
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residuals::test_utils::assert_jacobian_matches;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identical_geometry_is_zero() {
        let (vertex, neighbor) = ([0.3, -1.0, 2.0], [1.0, 0.5, 1.5]);
        let arap = ResidualArap::new(4.0, &vertex, &neighbor);
        let result = arap
            .linearize(&[&vertex, &neighbor, &[0.0, 0.0, 0.0]], false)
            .unwrap();
        assert_eq!(result.residual, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rotated_edge_is_zero() {
        let (vertex, neighbor) = ([0.0, 0.0, 0.0], [-1.0, 0.0, 0.0]);
        let arap = ResidualArap::new(1.0, &vertex, &neighbor);
        // the template edge (1, 0, 0) turned by 90 degrees about z
        let result = arap
            .linearize(
                &[&[0.0, 1.0, 0.0], &[0.0, 0.0, 0.0], &[0.0, 0.0, FRAC_PI_2]],
                false,
            )
            .unwrap();
        for r in result.residual {
            assert_relative_eq!(r, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unrotated_mismatch() {
        let (vertex, neighbor) = ([1.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let arap = ResidualArap::new(2.0, &vertex, &neighbor);
        let result = arap
            .linearize(&[&[0.0, 1.0, 0.0], &[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]], false)
            .unwrap();
        assert_eq!(result.residual, vec![-2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_jacobian() {
        let (vertex, neighbor) = ([0.1, 0.2, 0.3], [1.0, -0.5, 0.7]);
        let arap = ResidualArap::new(1.5, &vertex, &neighbor);
        let params = vec![
            vec![0.3, 0.1, -0.2],
            vec![1.2, 0.4, 0.9],
            vec![0.2, -0.4, 0.3],
        ];
        assert_jacobian_matches(&arap, &params, 1e-6);

        let at_identity = vec![params[0].clone(), params[1].clone(), vec![0.0; 3]];
        assert_jacobian_matches(&arap, &at_identity, 1e-6);
    }
}
