use meshtrack_optim::{check_params, Factor, FactorResult, LinearizationResult};

use super::{vec3, write_scaled_identity};

/// Total variation of an edge: keeps the current edge vector close to the template edge.
///
/// `r = weight * ((vertex - neighbor) - (current_vertex - current_neighbor))`
///
/// Parameters: `[current_vertex(3), current_neighbor(3)]`.
#[derive(Debug, Clone, Copy)]
pub struct ResidualTV<'a> {
    weight: f64,
    vertex: &'a [f64; 3],
    neighbor: &'a [f64; 3],
}

impl<'a> ResidualTV<'a> {
    pub fn new(weight: f64, vertex: &'a [f64; 3], neighbor: &'a [f64; 3]) -> Self {
        Self {
            weight,
            vertex,
            neighbor,
        }
    }
}

impl Factor for ResidualTV<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3])?;
        let reference_diff = vec3(self.vertex) - vec3(self.neighbor);
        let current_diff = vec3(params[0]) - vec3(params[1]);
        let residual = (reference_diff - current_diff) * self.weight;

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 3 * 6];
            write_scaled_identity(&mut jac, 6, 0, 0, -self.weight);
            write_scaled_identity(&mut jac, 6, 0, 3, self.weight);
            jac
        });

        Ok(LinearizationResult::new(
            residual.to_array().to_vec(),
            jacobian,
            6,
        ))
    }

    fn residual_dim(&self) -> usize {
        3
    }

    fn num_variables(&self) -> usize {
        2
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}

/// Smoothness of the local rotation field: `r = weight * (rotation - neighbor_rotation)`.
///
/// Parameters: `[local_rotation(3), neighbor_local_rotation(3)]`.
#[derive(Debug, Clone, Copy)]
pub struct ResidualRotTV {
    weight: f64,
}

impl ResidualRotTV {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl Factor for ResidualRotTV {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3])?;
        let residual = (vec3(params[0]) - vec3(params[1])) * self.weight;

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 3 * 6];
            write_scaled_identity(&mut jac, 6, 0, 0, self.weight);
            write_scaled_identity(&mut jac, 6, 0, 3, -self.weight);
            jac
        });

        Ok(LinearizationResult::new(
            residual.to_array().to_vec(),
            jacobian,
            6,
        ))
    }

    fn residual_dim(&self) -> usize {
        3
    }

    fn num_variables(&self) -> usize {
        2
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}

/// Inextensibility: penalizes stretching or shrinking of an edge.
///
/// `r = weight * (|vertex - neighbor| - |current_vertex - current_neighbor|)`
///
/// Parameters: `[current_vertex(3), current_neighbor(3)]`. The Jacobian is zero for a
/// degenerate (zero length) current edge.
#[derive(Debug, Clone, Copy)]
pub struct ResidualInextent<'a> {
    weight: f64,
    vertex: &'a [f64; 3],
    neighbor: &'a [f64; 3],
}

impl<'a> ResidualInextent<'a> {
    pub fn new(weight: f64, vertex: &'a [f64; 3], neighbor: &'a [f64; 3]) -> Self {
        Self {
            weight,
            vertex,
            neighbor,
        }
    }
}

impl Factor for ResidualInextent<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3])?;
        let reference_length = (vec3(self.vertex) - vec3(self.neighbor)).length();
        let current_diff = vec3(params[0]) - vec3(params[1]);
        let length = current_diff.length();

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 6];
            if length > 0.0 {
                let dir = current_diff * (self.weight / length);
                jac[..3].copy_from_slice(&(-dir).to_array());
                jac[3..].copy_from_slice(&dir.to_array());
            }
            jac
        });

        Ok(LinearizationResult::new(
            vec![self.weight * (reference_length - length)],
            jacobian,
            6,
        ))
    }

    fn residual_dim(&self) -> usize {
        1
    }

    fn num_variables(&self) -> usize {
        2
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}
