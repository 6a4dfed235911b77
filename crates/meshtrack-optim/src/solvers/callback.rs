//! Per-iteration hooks for the optimizer.

/// Snapshot of the optimizer state handed to callbacks after every iteration.
///
/// Iteration 0 is reported before the first step and carries the initial cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationSummary {
    /// Iteration counter, 0 for the initial state.
    pub iteration: usize,
    /// Cost at the current (accepted) parameter values.
    pub cost: f64,
    /// Decrease in cost produced by the tried step. Negative when the step was rejected.
    pub cost_change: f64,
    /// Norm of `J^T r` at the start of the iteration.
    pub gradient_norm: f64,
    /// Norm of the tried step.
    pub step_norm: f64,
    /// Whether the tried step was accepted.
    pub step_is_successful: bool,
    /// Damping used for the next iteration.
    pub lambda: f64,
}

/// What the optimizer should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackReturnType {
    /// Keep iterating.
    #[default]
    Continue,
    /// Stop and report the run as interrupted.
    Abort,
    /// Stop and report the run as successful.
    TerminateSuccessfully,
}

/// Observer invoked by the optimizer once per iteration.
pub trait IterationCallback {
    fn on_iteration(&mut self, summary: &IterationSummary) -> CallbackReturnType;
}

impl<F> IterationCallback for F
where
    F: FnMut(&IterationSummary) -> CallbackReturnType,
{
    fn on_iteration(&mut self, summary: &IterationSummary) -> CallbackReturnType {
        self(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_callback() {
        let mut seen = Vec::new();
        let mut callback = |summary: &IterationSummary| {
            seen.push(summary.iteration);
            CallbackReturnType::Continue
        };
        let summary = IterationSummary {
            iteration: 3,
            cost: 1.0,
            cost_change: 0.5,
            gradient_norm: 0.1,
            step_norm: 0.2,
            step_is_successful: true,
            lambda: 1e-3,
        };
        assert_eq!(
            callback.on_iteration(&summary),
            CallbackReturnType::Continue
        );
        assert_eq!(seen, vec![3]);
    }
}
