//! Robust losses on the squared norm of a residual block.
//!
//! A loss `rho(s)` is applied to the squared norm `s` of a residual block. The solver uses
//! `rho(s)` for the cost and `rho'(s)` to reweight the residual and Jacobian.

/// A loss `rho` applied to the squared residual norm `s`.
pub trait RobustLoss: Send + Sync {
    /// Compute loss weight `rho'(s)` for a squared residual norm.
    fn weight(&self, squared_norm: f64) -> f64;

    /// Robustified cost `rho(s)` of a squared residual norm.
    fn cost(&self, squared_norm: f64) -> f64;
}

/// Plain squared norm.
#[derive(Debug, Clone, Copy)]
pub struct IdentityLoss;

impl RobustLoss for IdentityLoss {
    fn weight(&self, _squared_norm: f64) -> f64 {
        1.0
    }

    fn cost(&self, squared_norm: f64) -> f64 {
        squared_norm
    }
}

/// Quadratic up to `|r| = delta`, linear beyond.
#[derive(Debug, Clone, Copy)]
pub struct HuberLoss {
    pub delta: f64,
}

impl HuberLoss {
    /// # Panics
    ///
    /// If `delta` is not positive.
    pub fn new(delta: f64) -> Self {
        assert!(delta > 0.0, "Huber delta must be positive, got {}", delta);
        HuberLoss { delta }
    }
}

impl RobustLoss for HuberLoss {
    fn weight(&self, squared_norm: f64) -> f64 {
        let delta_sq = self.delta * self.delta;
        if squared_norm <= delta_sq {
            1.0
        } else {
            self.delta / squared_norm.sqrt()
        }
    }

    fn cost(&self, squared_norm: f64) -> f64 {
        let delta_sq = self.delta * self.delta;
        if squared_norm <= delta_sq {
            squared_norm
        } else {
            2.0 * self.delta * squared_norm.sqrt() - delta_sq
        }
    }
}

/// `rho(s) = σ² ln(1 + s/σ²)`.
#[derive(Debug, Clone, Copy)]
pub struct CauchyLoss {
    pub scale: f64,
}

impl CauchyLoss {
    /// # Panics
    ///
    /// If `scale` is not positive.
    pub fn new(scale: f64) -> Self {
        assert!(scale > 0.0, "Cauchy scale must be positive, got {}", scale);
        CauchyLoss { scale }
    }
}

impl RobustLoss for CauchyLoss {
    fn weight(&self, squared_norm: f64) -> f64 {
        let scale_sq = self.scale * self.scale;
        1.0 / (1.0 + squared_norm / scale_sq)
    }

    fn cost(&self, squared_norm: f64) -> f64 {
        let scale_sq = self.scale * self.scale;
        scale_sq * (1.0 + squared_norm / scale_sq).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_loss_always_one() {
        let loss = IdentityLoss;
        assert_eq!(loss.weight(0.0), 1.0);
        assert_eq!(loss.weight(100.0), 1.0);
        assert_eq!(loss.cost(4.0), 4.0);
    }

    #[test]
    fn test_huber_loss_weights() {
        let huber = HuberLoss::new(1.0);
        assert_eq!(huber.weight(0.0), 1.0); // Zero: quadratic region
        assert_eq!(huber.weight(1.0), 1.0); // At threshold
        assert_relative_eq!(huber.weight(4.0), 0.5); // Large: 1/sqrt(4)
        assert!(huber.weight(10000.0).is_finite());
    }

    #[test]
    fn test_huber_loss_cost_is_continuous() {
        let huber = HuberLoss::new(2.0);
        assert_relative_eq!(huber.cost(1.0), 1.0);
        assert_relative_eq!(huber.cost(4.0), 4.0);
        assert_relative_eq!(huber.cost(4.0 + 1e-9), 4.0, epsilon = 1e-8);
        // linear growth in |r| beyond delta
        assert_relative_eq!(huber.cost(16.0), 2.0 * 2.0 * 4.0 - 4.0);
    }

    #[test]
    #[should_panic(expected = "Huber delta must be positive")]
    fn test_huber_loss_zero_delta_panics() {
        HuberLoss::new(0.0);
    }

    #[test]
    fn test_cauchy_loss_weights() {
        let cauchy = CauchyLoss::new(1.0);
        assert_eq!(cauchy.weight(0.0), 1.0);
        assert_relative_eq!(cauchy.weight(10.0), 1.0 / 11.0);
        assert_relative_eq!(cauchy.cost(0.0), 0.0);
        assert_relative_eq!(cauchy.cost(std::f64::consts::E - 1.0), 1.0);
    }

    #[test]
    #[should_panic(expected = "Cauchy scale must be positive")]
    fn test_cauchy_loss_negative_scale_panics() {
        CauchyLoss::new(-1.0);
    }

    #[test]
    fn test_huber_vs_cauchy_outlier_behavior() {
        let huber = HuberLoss::new(1.0);
        let cauchy = CauchyLoss::new(1.0);
        let squared_norm = 100.0;
        assert_relative_eq!(huber.weight(squared_norm), 0.1);
        assert!(cauchy.weight(squared_norm) < huber.weight(squared_norm));
    }
}
