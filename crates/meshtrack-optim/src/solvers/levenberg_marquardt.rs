//! Damped Gauss-Newton iterations on the dense normal equations.
//!
//! Every iteration solves `(JᵀJ + λI) δ = -Jᵀr` over the free variables, keeps the step if
//! it lowers the cost and otherwise restores the previous values and raises `λ`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::callback::{CallbackReturnType, IterationCallback, IterationSummary};
use super::linear_system::{LinearSystemBuilder, VariableLayout};
use crate::core::{FactorError, ParamError, Problem, ProblemError};

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    #[error("Factor evaluation failed: {0}")]
    Factor(#[from] FactorError),

    /// The damped system could not be factorized.
    #[error("Linear system solve failed: {0}")]
    SolveFailed(String),

    /// Nothing to optimize: no variables, no factors or every variable fixed.
    #[error("Empty problem: {0}")]
    EmptyProblem(&'static str),

    #[error("Parameter update failed: {0}")]
    Param(#[from] ParamError),
}

#[derive(Debug, Clone)]
pub struct OptimizerResult {
    /// Cost at the starting point.
    pub initial_cost: f64,
    /// Cost at the returned point.
    pub final_cost: f64,
    /// Number of solved steps, accepted or not.
    pub iterations: usize,
    pub termination_reason: TerminationReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Relative cost decrease of an accepted step below `cost_tolerance`.
    CostConverged,
    /// `|Jᵀr|` below `gradient_tolerance`.
    GradientConverged,
    MaxIterations,
    /// Steps kept failing until `λ` passed `lambda_max`.
    LambdaMaxExceeded,
    /// The callback returned [`CallbackReturnType::Abort`].
    Interrupted,
    /// The callback returned [`CallbackReturnType::TerminateSuccessfully`].
    UserSuccess,
}

/// Solver settings. Deserializes from partial configurations, missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardt {
    pub lambda_init: f64,
    pub lambda_max: f64,
    /// `λ` is divided by this on success and multiplied by it on failure.
    pub lambda_factor: f64,
    pub max_iterations: usize,
    pub cost_tolerance: f64,
    pub gradient_tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            lambda_init: 1e-3,
            lambda_max: 1e10,
            lambda_factor: 10.0,
            max_iterations: 50,
            cost_tolerance: 1e-6,
            gradient_tolerance: 1e-10,
        }
    }
}

impl LevenbergMarquardt {
    /// Steps shorter than this count as zero.
    const STEP_SIZE_TOLERANCE: f64 = 1e-12;

    /// Lower bound for the damping parameter.
    const LAMBDA_MIN: f64 = 1e-10;

    pub fn optimize(&self, problem: &mut Problem) -> Result<OptimizerResult, OptimizerError> {
        self.optimize_with_callback(problem, &mut |_: &IterationSummary| {
            CallbackReturnType::Continue
        })
    }

    pub fn optimize_with_callback<C>(
        &self,
        problem: &mut Problem,
        callback: &mut C,
    ) -> Result<OptimizerResult, OptimizerError>
    where
        C: IterationCallback + ?Sized,
    {
        if problem.get_variables().is_empty() {
            return Err(OptimizerError::EmptyProblem("no variables"));
        }

        if problem.get_factors().is_empty() {
            return Err(OptimizerError::EmptyProblem("no factors"));
        }

        let layout = VariableLayout::from_problem(problem);
        if layout.total_local_dim == 0 {
            return Err(OptimizerError::EmptyProblem("every variable is fixed"));
        }

        let initial_cost = problem.compute_total_cost()?;
        let mut current_cost = initial_cost;
        let mut lambda = self.lambda_init;
        let mut iterations = 0;

        let finish = |final_cost: f64,
                      iterations: usize,
                      reason: TerminationReason|
         -> Result<OptimizerResult, OptimizerError> {
            log::debug!(
                "LM finished after {} iterations: {:?}, cost {:.6e} -> {:.6e}",
                iterations,
                reason,
                initial_cost,
                final_cost
            );
            Ok(OptimizerResult {
                initial_cost,
                final_cost,
                iterations,
                termination_reason: reason,
            })
        };

        let init_summary = IterationSummary {
            iteration: 0,
            cost: current_cost,
            cost_change: 0.0,
            gradient_norm: 0.0,
            step_norm: 0.0,
            step_is_successful: true,
            lambda,
        };
        match callback.on_iteration(&init_summary) {
            CallbackReturnType::Continue => {}
            CallbackReturnType::Abort => {
                return finish(current_cost, iterations, TerminationReason::Interrupted)
            }
            CallbackReturnType::TerminateSuccessfully => {
                return finish(current_cost, iterations, TerminationReason::UserSuccess)
            }
        }

        loop {
            if iterations >= self.max_iterations {
                return finish(current_cost, iterations, TerminationReason::MaxIterations);
            }

            // JᵀJ and Jᵀr over the free variables
            let (jtj, jtr) = LinearSystemBuilder::build(problem, &layout)?;

            let gradient_norm = jtr.norm();
            if gradient_norm < self.gradient_tolerance {
                return finish(
                    current_cost,
                    iterations,
                    TerminationReason::GradientConverged,
                );
            }

            let delta = self.solve_damped_system(jtj, &jtr, lambda)?;

            let step_norm = delta.norm();
            if step_norm < Self::STEP_SIZE_TOLERANCE {
                return finish(current_cost, iterations, TerminationReason::CostConverged);
            }

            let snapshot = self.apply_step(problem, &layout.var_names, &delta)?;
            let new_cost = problem.compute_total_cost()?;
            iterations += 1;

            let cost_change = current_cost - new_cost;
            let relative_cost_change = if current_cost > 0.0 {
                cost_change.abs() / current_cost
            } else {
                cost_change.abs()
            };

            // NaN costs compare false and are rejected.
            let step_is_successful = cost_change > 0.0;
            if step_is_successful {
                current_cost = new_cost;
                lambda = (lambda / self.lambda_factor).max(Self::LAMBDA_MIN);
            } else {
                self.revert_step(problem, &layout.var_names, snapshot)?;
                lambda *= self.lambda_factor;
            }

            log::debug!(
                "LM iter {:3}: cost {:.6e}, |g| {:.3e}, |dx| {:.3e}, lambda {:.1e}, {}",
                iterations,
                current_cost,
                gradient_norm,
                step_norm,
                lambda,
                if step_is_successful { "accepted" } else { "rejected" }
            );

            let summary = IterationSummary {
                iteration: iterations,
                cost: current_cost,
                cost_change,
                gradient_norm,
                step_norm,
                step_is_successful,
                lambda,
            };
            match callback.on_iteration(&summary) {
                CallbackReturnType::Continue => {}
                CallbackReturnType::Abort => {
                    return finish(current_cost, iterations, TerminationReason::Interrupted)
                }
                CallbackReturnType::TerminateSuccessfully => {
                    return finish(current_cost, iterations, TerminationReason::UserSuccess)
                }
            }

            if step_is_successful && relative_cost_change < self.cost_tolerance {
                return finish(current_cost, iterations, TerminationReason::CostConverged);
            }
            if !step_is_successful && lambda > self.lambda_max {
                return finish(
                    current_cost,
                    iterations,
                    TerminationReason::LambdaMaxExceeded,
                );
            }
        }
    }

    /// Solve the damped system (J^T J + λI) δ = -J^T r.
    fn solve_damped_system(
        &self,
        mut jtj: DMatrix<f64>,
        jtr: &DVector<f64>,
        lambda: f64,
    ) -> Result<DVector<f64>, OptimizerError> {
        for i in 0..jtj.nrows() {
            jtj[(i, i)] += lambda;
        }

        let rhs = -jtr;
        jtj.lu()
            .solve(&rhs)
            .ok_or_else(|| OptimizerError::SolveFailed("LU solve failed".to_string()))
    }

    /// Apply the step to every free variable and return the previous values.
    fn apply_step(
        &self,
        problem: &mut Problem,
        var_names: &[String],
        delta: &DVector<f64>,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        let variables = problem.get_variables_mut();
        let mut param_offset = 0;
        let mut snapshot: Vec<Vec<f64>> = Vec::with_capacity(var_names.len());

        for var_name in var_names {
            let var =
                variables
                    .get_mut(var_name)
                    .ok_or_else(|| ProblemError::VariableNotFound {
                        name: var_name.clone(),
                    })?;

            snapshot.push(var.values.clone());

            let local = var.local_dim();
            let delta_block = &delta.as_slice()[param_offset..param_offset + local];
            var.var_type.apply_plus(&mut var.values, delta_block)?;

            param_offset += local;
        }

        Ok(snapshot)
    }

    /// Revert the step to the previous values.
    fn revert_step(
        &self,
        problem: &mut Problem,
        var_names: &[String],
        snapshot: Vec<Vec<f64>>,
    ) -> Result<(), OptimizerError> {
        let variables = problem.get_variables_mut();

        debug_assert_eq!(var_names.len(), snapshot.len());

        for (var_name, old_vals) in var_names.iter().zip(snapshot) {
            let var =
                variables
                    .get_mut(var_name)
                    .ok_or_else(|| ProblemError::VariableNotFound {
                        name: var_name.clone(),
                    })?;
            var.values = old_vals;
        }

        Ok(())
    }
}
