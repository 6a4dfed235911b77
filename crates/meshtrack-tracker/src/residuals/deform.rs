use meshtrack_optim::{check_params, Factor, FactorResult, LinearizationResult};

use super::{vec3, write_scaled_identity};

/// Anchors a vertex to a fixed position: `r = weight * (current_vertex - vertex)`.
///
/// Parameters: `[current_vertex(3)]`.
#[derive(Debug, Clone, Copy)]
pub struct ResidualDeform<'a> {
    weight: f64,
    vertex: &'a [f64; 3],
}

impl<'a> ResidualDeform<'a> {
    pub fn new(weight: f64, vertex: &'a [f64; 3]) -> Self {
        Self { weight, vertex }
    }
}

impl Factor for ResidualDeform<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3])?;
        let residual = (vec3(params[0]) - vec3(self.vertex)) * self.weight;

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 9];
            write_scaled_identity(&mut jac, 3, 0, 0, self.weight);
            jac
        });

        Ok(LinearizationResult::new(
            residual.to_array().to_vec(),
            jacobian,
            3,
        ))
    }

    fn residual_dim(&self) -> usize {
        3
    }

    fn num_variables(&self) -> usize {
        1
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}
