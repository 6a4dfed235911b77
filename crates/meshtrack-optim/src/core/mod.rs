mod factor;
mod problem;
mod variable;

pub use factor::{check_params, Factor, FactorError, FactorResult, LinearizationResult, PriorFactor};
pub use problem::{Problem, ProblemError};
pub use variable::{ParamError, Variable, VariableType};
