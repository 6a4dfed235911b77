use meshtrack_optim::{CauchyLoss, HuberLoss, IdentityLoss, RobustLoss};
use serde::{Deserialize, Serialize};

/// Kind of data term measured between the projected mesh and the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTermErrorType {
    /// Gray level difference against a reference intensity.
    #[default]
    Intensity,
    /// Per channel color difference against a reference color.
    Color,
    /// Point-to-point depth error.
    Depth,
    /// Point-to-plane depth error along the sampled surface normal.
    DepthPlane,
}

impl DataTermErrorType {
    /// All variants, in declaration order.
    pub const ALL: [DataTermErrorType; 4] = [
        DataTermErrorType::Intensity,
        DataTermErrorType::Color,
        DataTermErrorType::Depth,
        DataTermErrorType::DepthPlane,
    ];

    /// Number of residual components produced by this data term.
    pub const fn residual_num(self) -> usize {
        match self {
            DataTermErrorType::Intensity => 1,
            DataTermErrorType::Color => 3,
            DataTermErrorType::Depth => 3,
            DataTermErrorType::DepthPlane => 1,
        }
    }

    /// Number of reference values a data term of this kind needs.
    pub const fn reference_num(self) -> usize {
        match self {
            DataTermErrorType::Intensity => 1,
            DataTermErrorType::Color => 3,
            DataTermErrorType::Depth | DataTermErrorType::DepthPlane => 0,
        }
    }
}

/// Which parameter groups a bundle adjustment solve updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaType {
    /// Rigid motion only; vertices and local rotations are held fixed.
    Mot,
    /// Structure only; rigid rotation and translation are held fixed.
    Str,
    /// Motion and structure together.
    #[default]
    MotStr,
}

impl BaType {
    pub fn optimizes_motion(self) -> bool {
        matches!(self, BaType::Mot | BaType::MotStr)
    }

    pub fn optimizes_structure(self) -> bool {
        matches!(self, BaType::Str | BaType::MotStr)
    }
}

/// Robust loss on the squared norm of each data term.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataLoss {
    #[default]
    Quadratic,
    /// Quadratic up to a residual norm of `width`, linear beyond.
    Huber { width: f64 },
    /// `scale² ln(1 + s / scale²)`.
    Cauchy { scale: f64 },
}

impl DataLoss {
    /// Width or scale is finite and positive.
    pub fn is_valid(&self) -> bool {
        match *self {
            DataLoss::Quadratic => true,
            DataLoss::Huber { width: p } | DataLoss::Cauchy { scale: p } => {
                p.is_finite() && p > 0.0
            }
        }
    }
}

impl RobustLoss for DataLoss {
    fn weight(&self, squared_norm: f64) -> f64 {
        match *self {
            DataLoss::Quadratic => IdentityLoss.weight(squared_norm),
            DataLoss::Huber { width } => HuberLoss { delta: width }.weight(squared_norm),
            DataLoss::Cauchy { scale } => CauchyLoss { scale }.weight(squared_norm),
        }
    }

    fn cost(&self, squared_norm: f64) -> f64 {
        match *self {
            DataLoss::Quadratic => IdentityLoss.cost(squared_norm),
            DataLoss::Huber { width } => HuberLoss { delta: width }.cost(squared_norm),
            DataLoss::Cauchy { scale } => CauchyLoss { scale }.cost(squared_norm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residual_num_table() {
        let nums: Vec<usize> = DataTermErrorType::ALL
            .iter()
            .map(|t| t.residual_num())
            .collect();
        assert_eq!(nums, vec![1, 3, 3, 1]);
    }

    #[test]
    fn test_ba_type_groups() {
        assert!(BaType::Mot.optimizes_motion());
        assert!(!BaType::Mot.optimizes_structure());
        assert!(!BaType::Str.optimizes_motion());
        assert!(BaType::Str.optimizes_structure());
        assert!(BaType::MotStr.optimizes_motion() && BaType::MotStr.optimizes_structure());
    }

    #[test]
    fn test_serde_names() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&DataTermErrorType::DepthPlane)?,
            "\"depth_plane\""
        );
        let ba: BaType = serde_json::from_str("\"mot_str\"")?;
        assert_eq!(ba, BaType::MotStr);
        Ok(())
    }

    #[test]
    fn test_data_loss() {
        assert_eq!(DataLoss::Quadratic.cost(9.0), 9.0);
        assert_eq!(DataLoss::Quadratic.weight(9.0), 1.0);

        let huber = DataLoss::Huber { width: 1.0 };
        assert_eq!(huber.cost(0.25), 0.25);
        assert_eq!(huber.cost(9.0), 2.0 * 3.0 - 1.0);
        assert_eq!(huber.weight(9.0), 1.0 / 3.0);

        let cauchy = DataLoss::Cauchy { scale: 1.0 };
        assert_eq!(cauchy.weight(3.0), 0.25);
        assert!((cauchy.cost(3.0) - 4.0f64.ln()).abs() < 1e-12);

        assert!(huber.is_valid());
        assert!(!DataLoss::Huber { width: 0.0 }.is_valid());
        assert!(!DataLoss::Cauchy { scale: f64::NAN }.is_valid());
    }

    #[test]
    fn test_data_loss_serde() {
        let loss: DataLoss = serde_json::from_str(r#"{ "type": "cauchy", "scale": 0.5 }"#).unwrap();
        assert_eq!(loss, DataLoss::Cauchy { scale: 0.5 });
        let loss: DataLoss = serde_json::from_str(r#"{ "type": "quadratic" }"#).unwrap();
        assert_eq!(loss, DataLoss::Quadratic);
    }
}
