//! Named parameter blocks and the factors reading them.
//!
//! Factors may borrow read-only data (images, reference meshes) for the lifetime `'a` of the
//! problem.

use std::collections::HashMap;

use rayon::prelude::*;
use thiserror::Error;

use super::factor::{Factor, FactorError, LinearizationResult};
use super::variable::Variable;

#[derive(Debug, Error, PartialEq)]
pub enum ProblemError {
    /// Two variables share a name.
    #[error("Variable '{name}' already exists")]
    DuplicateVariable { name: String },
    /// A factor or lookup names an unknown variable.
    #[error("Variable '{name}' not found")]
    VariableNotFound { name: String },
    /// Value count does not match the variable or factor block size.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Factor evaluation failed: {0}")]
    FactorEvaluation(#[from] FactorError),
}

type FactorEntry<'a> = (Box<dyn Factor + 'a>, Vec<String>);

/// Variables keyed by name plus the factors connecting them.
#[derive(Default)]
pub struct Problem<'a> {
    variables: HashMap<String, Variable>,
    /// Each factor with the ordered names of its variables.
    factors: Vec<FactorEntry<'a>>,
}

impl<'a> Problem<'a> {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            factors: Vec::new(),
        }
    }

    pub fn add_variable(
        &mut self,
        mut var: Variable,
        initial_values: Vec<f64>,
    ) -> Result<(), ProblemError> {
        if self.variables.contains_key(&var.name) {
            return Err(ProblemError::DuplicateVariable {
                name: var.name.clone(),
            });
        }
        if initial_values.len() != var.global_dim() {
            return Err(ProblemError::DimensionMismatch {
                expected: var.global_dim(),
                actual: initial_values.len(),
            });
        }
        var.values = initial_values;
        self.variables.insert(var.name.clone(), var);
        Ok(())
    }

    /// Register a factor connecting the named variables, in the order the factor expects them.
    pub fn add_factor(
        &mut self,
        factor: Box<dyn Factor + 'a>,
        var_names: Vec<String>,
    ) -> Result<(), ProblemError> {
        if factor.num_variables() != var_names.len() {
            return Err(ProblemError::DimensionMismatch {
                expected: factor.num_variables(),
                actual: var_names.len(),
            });
        }
        for (idx, name) in var_names.iter().enumerate() {
            let var = self
                .variables
                .get(name)
                .ok_or_else(|| ProblemError::VariableNotFound { name: name.clone() })?;
            if var.local_dim() != factor.variable_local_dim(idx) {
                return Err(ProblemError::DimensionMismatch {
                    expected: factor.variable_local_dim(idx),
                    actual: var.local_dim(),
                });
            }
        }
        self.factors.push((factor, var_names));
        Ok(())
    }

    /// Hold a variable constant (or release it) during optimization.
    pub fn set_variable_fixed(&mut self, name: &str, fixed: bool) -> Result<(), ProblemError> {
        let var = self
            .variables
            .get_mut(name)
            .ok_or_else(|| ProblemError::VariableNotFound {
                name: name.to_string(),
            })?;
        var.fixed = fixed;
        Ok(())
    }

    pub fn get_variables(&self) -> &HashMap<String, Variable> {
        &self.variables
    }

    pub fn get_variables_mut(&mut self) -> &mut HashMap<String, Variable> {
        &mut self.variables
    }

    /// Current values of the named variable.
    pub fn get_variable_values(&self, name: &str) -> Result<&[f64], ProblemError> {
        self.variables
            .get(name)
            .map(|var| var.values.as_slice())
            .ok_or_else(|| ProblemError::VariableNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_factors(&self) -> &[FactorEntry<'a>] {
        &self.factors
    }

    /// Number of free (non fixed) variables.
    pub fn num_free_variables(&self) -> usize {
        self.variables.values().filter(|v| !v.fixed).count()
    }

    fn linearize_factor(
        &self,
        factor: &dyn Factor,
        var_names: &[String],
        compute_jacobian: bool,
    ) -> Result<LinearizationResult, ProblemError> {
        let mut params = Vec::with_capacity(var_names.len());
        for name in var_names {
            let var = self
                .variables
                .get(name)
                .ok_or_else(|| ProblemError::VariableNotFound { name: name.clone() })?;
            params.push(var.values.as_slice());
        }
        Ok(factor.linearize(&params, compute_jacobian)?)
    }

    /// Linearize every factor at the current variable values, in registration order.
    ///
    /// Factors are evaluated in parallel.
    pub fn linearize_all(
        &self,
        compute_jacobian: bool,
    ) -> Result<Vec<LinearizationResult>, ProblemError> {
        self.factors
            .par_iter()
            .map(|(factor, var_names)| {
                self.linearize_factor(factor.as_ref(), var_names, compute_jacobian)
            })
            .collect()
    }

    /// Total cost: sum over factors of the robustified squared residual norm.
    pub fn compute_total_cost(&self) -> Result<f64, ProblemError> {
        let results = self.linearize_all(false)?;

        let total_cost = self
            .factors
            .iter()
            .zip(&results)
            .map(|((factor, _), result)| {
                let squared_norm = result.squared_norm();
                match factor.get_loss() {
                    Some(loss) => loss.cost(squared_norm),
                    None => squared_norm,
                }
            })
            .sum();

        Ok(total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PriorFactor;
    use crate::losses::HuberLoss;
    use crate::RobustLoss;

    struct RobustPrior {
        prior: PriorFactor,
        loss: HuberLoss,
    }

    impl Factor for RobustPrior {
        fn linearize(
            &self,
            params: &[&[f64]],
            compute_jacobian: bool,
        ) -> Result<LinearizationResult, FactorError> {
            self.prior.linearize(params, compute_jacobian)
        }

        fn residual_dim(&self) -> usize {
            self.prior.residual_dim()
        }

        fn num_variables(&self) -> usize {
            1
        }

        fn variable_local_dim(&self, idx: usize) -> usize {
            self.prior.variable_local_dim(idx)
        }

        fn get_loss(&self) -> Option<&dyn RobustLoss> {
            Some(&self.loss)
        }
    }

    #[test]
    fn test_add_and_get_variable() {
        let mut problem = Problem::new();
        let var = Variable::euclidean("R", 2);
        assert!(problem.add_variable(var.clone(), vec![1.0, 2.0]).is_ok());

        let vars = problem.get_variables();
        assert!(vars.contains_key("R"));
        assert_eq!(vars["R"].values, vec![1.0, 2.0]);
        assert_eq!(problem.get_variable_values("R").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_add_variable_duplicate_should_fail() {
        let mut problem = Problem::new();
        let var = Variable::euclidean("R", 2);
        assert!(problem.add_variable(var.clone(), vec![1.0, 2.0]).is_ok());
        assert_eq!(
            problem.add_variable(var, vec![1.0, 2.0]),
            Err(ProblemError::DuplicateVariable {
                name: "R".to_string()
            })
        );
    }

    #[test]
    fn test_add_variable_wrong_dim_should_fail() {
        let mut problem = Problem::new();
        let var = Variable::euclidean("R", 2);
        assert!(problem.add_variable(var, vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_add_factor_checks_variables() {
        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean("x", 2), vec![1.0, 2.0])
            .unwrap();

        let res = problem.add_factor(
            Box::new(PriorFactor::new(vec![1.0, 1.0])),
            vec!["not_present".to_string()],
        );
        assert_eq!(
            res,
            Err(ProblemError::VariableNotFound {
                name: "not_present".to_string()
            })
        );

        let res = problem.add_factor(
            Box::new(PriorFactor::new(vec![1.0, 1.0, 1.0])),
            vec!["x".to_string()],
        );
        assert!(matches!(res, Err(ProblemError::DimensionMismatch { .. })));

        assert!(problem
            .add_factor(Box::new(PriorFactor::new(vec![1.5, 2.5])), vec!["x".to_string()])
            .is_ok());
        assert_eq!(problem.get_factors().len(), 1);
    }

    #[test]
    fn test_set_variable_fixed() {
        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean("x", 1), vec![0.0])
            .unwrap();
        assert_eq!(problem.num_free_variables(), 1);
        problem.set_variable_fixed("x", true).unwrap();
        assert_eq!(problem.num_free_variables(), 0);
        assert!(problem.set_variable_fixed("y", true).is_err());
    }

    #[test]
    fn test_compute_total_cost() {
        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean("foo", 2), vec![3.0, -2.0])
            .unwrap();
        problem
            .add_factor(
                Box::new(PriorFactor::new(vec![4.0, -5.0])),
                vec!["foo".to_string()],
            )
            .unwrap();

        // (3 - 4)^2 + (-2 + 5)^2
        let cost = problem.compute_total_cost().unwrap();
        assert!((cost - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_compute_total_cost_with_loss() {
        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean("x", 1), vec![4.0])
            .unwrap();
        problem
            .add_factor(
                Box::new(RobustPrior {
                    prior: PriorFactor::new(vec![0.0]),
                    loss: HuberLoss::new(1.0),
                }),
                vec!["x".to_string()],
            )
            .unwrap();

        // huber(16) with delta 1: 2 * 1 * 4 - 1
        let cost = problem.compute_total_cost().unwrap();
        assert!((cost - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_factor_may_borrow_data() {
        let target = vec![1.0, 2.0];
        let borrowed: &[f64] = &target;

        struct BorrowedPrior<'t>(&'t [f64]);

        impl Factor for BorrowedPrior<'_> {
            fn linearize(
                &self,
                params: &[&[f64]],
                compute_jacobian: bool,
            ) -> Result<LinearizationResult, FactorError> {
                PriorFactor::new(self.0.to_vec()).linearize(params, compute_jacobian)
            }
            fn residual_dim(&self) -> usize {
                self.0.len()
            }
            fn num_variables(&self) -> usize {
                1
            }
            fn variable_local_dim(&self, _idx: usize) -> usize {
                self.0.len()
            }
        }

        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean("x", 2), vec![0.0, 0.0])
            .unwrap();
        problem
            .add_factor(Box::new(BorrowedPrior(borrowed)), vec!["x".to_string()])
            .unwrap();
        assert!((problem.compute_total_cost().unwrap() - 5.0).abs() < 1e-12);
    }
}
