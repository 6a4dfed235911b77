//! Tracking configuration, loadable from JSON.
use std::path::Path;

use meshtrack_optim::LevenbergMarquardt;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::types::{BaType, DataLoss, DataTermErrorType};

/// Weights and options of one tracking solve.
///
/// Missing fields take their default values. Terms with a zero weight are not added to the
/// problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Kind of data term.
    pub error_type: DataTermErrorType,
    /// Which parameter groups to optimize.
    pub ba_type: BaType,
    /// Weight of the data term.
    pub data_weight: f64,
    /// Robust loss on the data term.
    pub data_loss: DataLoss,
    pub tv_weight: f64,
    pub rot_tv_weight: f64,
    pub inextent_weight: f64,
    pub arap_weight: f64,
    pub deform_weight: f64,
    /// Weight of the rotation half of the temporal motion prior.
    pub temporal_rot_weight: f64,
    /// Weight of the translation half of the temporal motion prior.
    pub temporal_trans_weight: f64,
    /// Dump the temporal motion operands at trace level on every evaluation.
    pub verbose: bool,
    /// Optimizer settings.
    pub solver: LevenbergMarquardt,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            error_type: DataTermErrorType::Intensity,
            ba_type: BaType::MotStr,
            data_weight: 1.0,
            data_loss: DataLoss::Quadratic,
            tv_weight: 0.0,
            rot_tv_weight: 0.0,
            inextent_weight: 0.0,
            arap_weight: 1.0,
            deform_weight: 0.0,
            temporal_rot_weight: 0.0,
            temporal_trans_weight: 0.0,
            verbose: false,
            solver: LevenbergMarquardt::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject weights, loss widths and solver settings the solver cannot use.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let weights = [
            ("data_weight", self.data_weight),
            ("tv_weight", self.tv_weight),
            ("rot_tv_weight", self.rot_tv_weight),
            ("inextent_weight", self.inextent_weight),
            ("arap_weight", self.arap_weight),
            ("deform_weight", self.deform_weight),
            ("temporal_rot_weight", self.temporal_rot_weight),
            ("temporal_trans_weight", self.temporal_trans_weight),
        ];
        if let Some((name, w)) = weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(TrackerError::InvalidConfig(format!("{name} is {w}")));
        }
        if !self.data_loss.is_valid() {
            return Err(TrackerError::InvalidConfig(format!(
                "data_loss parameter must be positive, got {:?}",
                self.data_loss
            )));
        }

        let solver = &self.solver;
        if !(solver.lambda_init.is_finite() && solver.lambda_init > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "solver.lambda_init must be positive, got {}",
                solver.lambda_init
            )));
        }
        if solver.lambda_max.is_nan() || solver.lambda_max < solver.lambda_init {
            return Err(TrackerError::InvalidConfig(format!(
                "solver.lambda_max ({}) is below solver.lambda_init ({})",
                solver.lambda_max, solver.lambda_init
            )));
        }
        if !(solver.lambda_factor.is_finite() && solver.lambda_factor > 1.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "solver.lambda_factor must be greater than 1, got {}",
                solver.lambda_factor
            )));
        }
        let tolerances_ok = solver.cost_tolerance >= 0.0 && solver.gradient_tolerance >= 0.0;
        if !tolerances_ok {
            return Err(TrackerError::InvalidConfig(format!(
                "solver tolerances must be non negative, got {} and {}",
                solver.cost_tolerance, solver.gradient_tolerance
            )));
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
