#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Factors represent constraints or measurements in a factor graph. Each factor computes a
//! residual (error) and optionally a Jacobian with respect to the connected variables; the
//! Levenberg-Marquardt solver minimizes the sum of their (robustified) squared norms.
//!
//! # References
//!
//! - [apex-solver](https://github.com/amin-abouee/apex-solver): A Rust-based library
//!   for efficient non-linear least squares optimization with factor graph support
//! - [ceres-solver](https://github.com/ceres-solver/ceres-solver): A C++ library for modeling and solving large, complicated optimization problems.

pub mod core;
pub mod losses;
pub mod solvers;

pub use crate::core::{
    check_params, Factor, FactorError, FactorResult, LinearizationResult, ParamError, PriorFactor,
    Problem, ProblemError, Variable, VariableType,
};
pub use crate::losses::{CauchyLoss, HuberLoss, IdentityLoss, RobustLoss};
pub use crate::solvers::{
    CallbackReturnType, IterationCallback, IterationSummary, LevenbergMarquardt, OptimizerError,
    OptimizerResult, TerminationReason,
};
