mod callback;
mod levenberg_marquardt;
mod linear_system;

pub use callback::{CallbackReturnType, IterationCallback, IterationSummary};
pub use levenberg_marquardt::{
    LevenbergMarquardt, OptimizerError, OptimizerResult, TerminationReason,
};
