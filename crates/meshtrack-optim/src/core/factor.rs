//! Residual blocks and their linearization.

use thiserror::Error;

use crate::losses::RobustLoss;

#[derive(Debug, Error, PartialEq)]
pub enum FactorError {
    /// A parameter block or Jacobian has the wrong size.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The solver asked for a Jacobian and the factor returned none.
    #[error("Factor returned no Jacobian")]
    MissingJacobian,

    /// Data the factor samples from is not available.
    #[error("Missing input: {0}")]
    MissingInput(String),
}

pub type FactorResult<T> = Result<T, FactorError>;

/// Residual of one factor and, on request, its Jacobian.
#[derive(Debug, Clone)]
pub struct LinearizationResult {
    pub residual: Vec<f64>,
    /// Row-major `residual.len() x total_local_dim` matrix.
    pub jacobian: Option<Vec<f64>>,
    pub total_local_dim: usize,
}

impl LinearizationResult {
    pub fn new(residual: Vec<f64>, jacobian: Option<Vec<f64>>, total_local_dim: usize) -> Self {
        Self {
            residual,
            jacobian,
            total_local_dim,
        }
    }

    pub fn residual_dim(&self) -> usize {
        self.residual.len()
    }

    /// Sum of squared residual components.
    pub fn squared_norm(&self) -> f64 {
        self.residual.iter().map(|r| r * r).sum()
    }
}

/// Check the number of parameter blocks and their sizes before evaluating a factor.
pub fn check_params(params: &[&[f64]], expected_dims: &[usize]) -> FactorResult<()> {
    if params.len() != expected_dims.len() {
        return Err(FactorError::DimensionMismatch {
            expected: expected_dims.len(),
            actual: params.len(),
        });
    }
    params
        .iter()
        .zip(expected_dims)
        .try_for_each(|(block, &dim)| match block.len() == dim {
            true => Ok(()),
            false => Err(FactorError::DimensionMismatch {
                expected: dim,
                actual: block.len(),
            }),
        })
}

/// A residual block over a fixed, ordered list of parameter blocks.
///
/// `linearize` receives one slice per connected variable, in the order the variables were
/// passed to [`crate::Problem::add_factor`]. The Jacobian, when requested, has one row per
/// residual component and the local dimensions of all connected variables as columns,
/// concatenated in the same order.
///
/// Factors are evaluated concurrently, hence the `Send + Sync` bound: they must only read the
/// data they borrow.
pub trait Factor: Send + Sync {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult>;

    /// Number of residual components.
    fn residual_dim(&self) -> usize;

    /// Number of connected variables.
    fn num_variables(&self) -> usize;

    /// Local dimension of the connected variable at `idx`.
    fn variable_local_dim(&self, idx: usize) -> usize;

    fn total_local_dim(&self) -> usize {
        (0..self.num_variables())
            .map(|i| self.variable_local_dim(i))
            .sum()
    }

    /// Robust loss applied to the squared residual norm.
    fn get_loss(&self) -> Option<&dyn RobustLoss> {
        None
    }
}

/// Pulls a single variable towards `target`: `r = x - target`.
#[derive(Debug, Clone)]
pub struct PriorFactor {
    pub target: Vec<f64>,
}

impl PriorFactor {
    pub fn new(target: Vec<f64>) -> Self {
        Self { target }
    }
}

impl Factor for PriorFactor {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        let n = self.target.len();
        check_params(params, &[n])?;

        let residual = params[0]
            .iter()
            .zip(&self.target)
            .map(|(x, t)| x - t)
            .collect();

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; n * n];
            jac.iter_mut().step_by(n + 1).for_each(|d| *d = 1.0);
            jac
        });

        Ok(LinearizationResult::new(residual, jacobian, n))
    }

    fn residual_dim(&self) -> usize {
        self.target.len()
    }

    fn num_variables(&self) -> usize {
        1
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        self.target.len()
    }
}
