use meshtrack_optim::{check_params, Factor, FactorResult, LinearizationResult};

/// Penalizes the change of the rigid motion between consecutive frames.
///
/// `r = [rot_weight * (rotation - prev_rotation), trans_weight * (translation - prev_translation)]`
///
/// Parameters: `[rotation(3), translation(3)]`. With `verbose` set, every evaluation dumps its
/// operands at trace level.
#[derive(Debug, Clone, Copy)]
pub struct ResidualTemporalMotion<'a> {
    prev_rotation: &'a [f64; 3],
    prev_translation: &'a [f64; 3],
    rot_weight: f64,
    trans_weight: f64,
    verbose: bool,
}

impl<'a> ResidualTemporalMotion<'a> {
    pub fn new(
        prev_rotation: &'a [f64; 3],
        prev_translation: &'a [f64; 3],
        rot_weight: f64,
        trans_weight: f64,
    ) -> Self {
        Self {
            prev_rotation,
            prev_translation,
            rot_weight,
            trans_weight,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Factor for ResidualTemporalMotion<'_> {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        check_params(params, &[3, 3])?;
        let (rotation, translation) = (params[0], params[1]);

        let mut residual = vec![0.0; 6];
        for i in 0..3 {
            residual[i] = self.rot_weight * (rotation[i] - self.prev_rotation[i]);
            residual[i + 3] = self.trans_weight * (translation[i] - self.prev_translation[i]);
        }

        if self.verbose {
            log::trace!(
                "temporal motion: rot_weight {} trans_weight {} rotation {:?} translation {:?} \
                 prev_rotation {:?} prev_translation {:?}",
                self.rot_weight,
                self.trans_weight,
                rotation,
                translation,
                self.prev_rotation,
                self.prev_translation
            );
        }

        let jacobian = compute_jacobian.then(|| {
            let mut jac = vec![0.0; 6 * 6];
            for i in 0..3 {
                jac[i * 6 + i] = self.rot_weight;
                jac[(i + 3) * 6 + i + 3] = self.trans_weight;
            }
            jac
        });

        Ok(LinearizationResult::new(residual, jacobian, 6))
    }

    fn residual_dim(&self) -> usize {
        6
    }

    fn num_variables(&self) -> usize {
        2
    }

    fn variable_local_dim(&self, _idx: usize) -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residuals::test_utils::assert_jacobian_matches;

    #[test]
    fn test_halves_scale_independently() {
        let (prev_rot, prev_trans) = ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let rotation = [0.5, -0.25, 1.0];
        let translation = [2.0, 0.0, 1.5];

        let eval = |rot_weight, trans_weight| {
            ResidualTemporalMotion::new(&prev_rot, &prev_trans, rot_weight, trans_weight)
                .linearize(&[&rotation, &translation], false)
                .unwrap()
                .residual
        };

        let base = eval(1.0, 1.0);
        assert_eq!(base, vec![0.5, -0.25, 1.0, 1.0, -1.0, 0.5]);

        let double_rot = eval(2.0, 1.0);
        assert_eq!(double_rot[..3], [1.0, -0.5, 2.0]);
        assert_eq!(double_rot[3..], base[3..]);

        let triple_trans = eval(1.0, 3.0);
        assert_eq!(triple_trans[..3], base[..3]);
        assert_eq!(triple_trans[3..], [3.0, -3.0, 1.5]);
    }

    #[test]
    fn test_verbose_does_not_change_residual() {
        let (prev_rot, prev_trans) = ([0.1, 0.2, 0.3], [0.0, 0.0, 0.0]);
        let factor = ResidualTemporalMotion::new(&prev_rot, &prev_trans, 1.0, 2.0);
        let params: [&[f64]; 2] = [&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]];
        let quiet = factor.linearize(&params, false).unwrap();
        let loud = factor.with_verbose(true).linearize(&params, false).unwrap();
        assert_eq!(quiet.residual, loud.residual);
    }

    #[test]
    fn test_jacobian() {
        let (prev_rot, prev_trans) = ([0.1, 0.2, 0.3], [0.0, -1.0, 2.0]);
        let factor = ResidualTemporalMotion::new(&prev_rot, &prev_trans, 0.5, 4.0);
        assert_jacobian_matches(&factor, &[vec![0.3, 0.0, 0.1], vec![1.0, 2.0, 3.0]], 1e-6);
    }
}
