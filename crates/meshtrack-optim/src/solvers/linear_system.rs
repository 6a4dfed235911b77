use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use super::OptimizerError;
use crate::core::{Factor, FactorError, LinearizationResult, Problem};

/// Precomputed ordering and dimension layout of the free variables.
///
/// Fixed variables get no columns in the linear system.
#[derive(Debug, Clone)]
pub struct VariableLayout {
    pub var_names: Vec<String>,
    pub var_index_map: HashMap<String, usize>,
    pub global_starts: Vec<usize>,
    pub total_local_dim: usize,
}

impl VariableLayout {
    pub fn from_problem(problem: &Problem) -> Self {
        let variables = problem.get_variables();
        let mut var_names: Vec<String> = variables
            .iter()
            .filter(|(_, var)| !var.fixed)
            .map(|(name, _)| name.clone())
            .collect();
        var_names.sort();

        let var_index_map: HashMap<String, usize> = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut total_local_dim: usize = 0;
        let mut global_starts: Vec<usize> = Vec::with_capacity(var_names.len());

        for name in &var_names {
            global_starts.push(total_local_dim);
            total_local_dim += variables[name].local_dim();
        }

        Self {
            var_names,
            var_index_map,
            global_starts,
            total_local_dim,
        }
    }
}

/// Block of Jacobian columns owned by one free variable:
/// (global start, dim, column offset inside the factor Jacobian).
type ColumnBlock = (usize, usize, usize);

/// Builds normal equations from factors for a given layout.
pub struct LinearSystemBuilder;

impl LinearSystemBuilder {
    /// Build `J^T J` and `J^T r` at the current variable values.
    pub fn build(
        problem: &Problem,
        layout: &VariableLayout,
    ) -> Result<(DMatrix<f64>, DVector<f64>), OptimizerError> {
        let factors = problem.get_factors();
        let results = problem.linearize_all(true)?;

        // factors are linearized in parallel, the normal equations are summed into one system
        let n = layout.total_local_dim;
        let mut jtj = DMatrix::<f64>::zeros(n, n);
        let mut jtr = DVector::<f64>::zeros(n);
        for ((factor, var_names), result) in factors.iter().zip(&results) {
            let blocks = Self::factor_blocks(factor.as_ref(), var_names, result, layout)?;
            Self::accumulate(factor.as_ref(), result, &blocks, &mut jtj, &mut jtr)?;
        }

        Ok((jtj, jtr))
    }

    fn factor_blocks(
        factor: &dyn Factor,
        var_names: &[String],
        result: &LinearizationResult,
        layout: &VariableLayout,
    ) -> Result<Vec<ColumnBlock>, OptimizerError> {
        let expected_cols = factor.total_local_dim();
        if result.total_local_dim != expected_cols {
            return Err(OptimizerError::Factor(FactorError::DimensionMismatch {
                expected: expected_cols,
                actual: result.total_local_dim,
            }));
        }

        let mut blocks = Vec::with_capacity(var_names.len());
        let mut factor_col_offset = 0;
        for (idx, var_name) in var_names.iter().enumerate() {
            let dim = factor.variable_local_dim(idx);
            if let Some(&var_idx) = layout.var_index_map.get(var_name) {
                blocks.push((layout.global_starts[var_idx], dim, factor_col_offset));
            }
            factor_col_offset += dim;
        }
        Ok(blocks)
    }

    fn accumulate(
        factor: &dyn Factor,
        result: &LinearizationResult,
        blocks: &[ColumnBlock],
        jtj: &mut DMatrix<f64>,
        jtr: &mut DVector<f64>,
    ) -> Result<(), OptimizerError> {
        let jacobian = result
            .jacobian
            .as_ref()
            .ok_or(OptimizerError::Factor(FactorError::MissingJacobian))?;

        // Robust losses rescale residual and Jacobian by sqrt(rho'(s)).
        let sqrt_weight = factor
            .get_loss()
            .map(|loss| loss.weight(result.squared_norm()).sqrt())
            .unwrap_or(1.0);

        let residual_dim = result.residual_dim();
        let total_local_dim = result.total_local_dim;

        for row in 0..residual_dim {
            let jac_row = &jacobian[row * total_local_dim..(row + 1) * total_local_dim];
            let residual_val = result.residual[row] * sqrt_weight;

            for &(global_start_i, dim_i, factor_col_offset_i) in blocks {
                for di in 0..dim_i {
                    let jac_i_val = jac_row[factor_col_offset_i + di] * sqrt_weight;
                    if jac_i_val == 0.0 {
                        continue;
                    }
                    jtr[global_start_i + di] += jac_i_val * residual_val;

                    for &(global_start_j, dim_j, factor_col_offset_j) in blocks {
                        for dj in 0..dim_j {
                            let jac_j_val = jac_row[factor_col_offset_j + dj] * sqrt_weight;
                            jtj[(global_start_i + di, global_start_j + dj)] +=
                                jac_i_val * jac_j_val;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
