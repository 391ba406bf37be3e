use alignment::alphabet::NUM_AA;

use crate::params::PottsParams;

/// L2 penalty with optional centering of the single block.
///
/// `Omega = lambda_single * sum (v - c_v)^2 + lambda_pair * sum w^2`
///
/// The pair coefficient passed to [`L2::new`] is the base value; the stored
/// coefficient is `lambda_pair_base * (L - 1)`, following the convention that
/// the penalty per coupling grows with the number of partners each column
/// has. Tree-guided contrastive divergence halves the stored coefficient via
/// [`L2::scale_pair`].
#[derive(Debug, Clone)]
pub struct L2 {
    pub lambda_single: f64,
    pub lambda_pair: f64,
    /// `c_v[L][20]`; `None` regularizes the single block toward zero.
    center_v: Option<Vec<f64>>,
}

impl std::fmt::Display for L2 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "L2(lambda_single={}, lambda_pair={}, centered={})",
            self.lambda_single,
            self.lambda_pair,
            self.center_v.is_some()
        )
    }
}

impl L2 {
    #[must_use]
    pub fn new(lambda_single: f64, lambda_pair_base: f64, ncol: usize, center_v: Option<Vec<f64>>) -> Self {
        if let Some(center) = &center_v {
            assert_eq!(center.len(), ncol * NUM_AA, "centering vector must be L x 20");
        }
        Self {
            lambda_single,
            lambda_pair: lambda_pair_base * (ncol.saturating_sub(1)) as f64,
            center_v,
        }
    }

    /// Rescale the pair coefficient after construction.
    pub fn scale_pair(&mut self, factor: f64) {
        self.lambda_pair *= factor;
    }

    #[must_use]
    pub fn center_v(&self) -> Option<&[f64]> {
        self.center_v.as_deref()
    }

    /// Evaluate the penalty and write its gradient into `grad`
    /// (overwriting; callers fold the result into their own layout).
    pub fn apply_into(&self, params: &PottsParams, grad: &mut PottsParams) -> f64 {
        debug_assert_eq!(params.ncol(), grad.ncol());
        let mut penalty = 0.0;

        match &self.center_v {
            Some(center) => {
                for ((g, &v), &c) in grad.v.iter_mut().zip(params.v.iter()).zip(center.iter()) {
                    let delta = v - c;
                    penalty += self.lambda_single * delta * delta;
                    *g = 2.0 * self.lambda_single * delta;
                }
            }
            None => {
                for (g, &v) in grad.v.iter_mut().zip(params.v.iter()) {
                    penalty += self.lambda_single * v * v;
                    *g = 2.0 * self.lambda_single * v;
                }
            }
        }

        for (g, &w) in grad.w.iter_mut().zip(params.w.iter()) {
            penalty += self.lambda_pair * w * w;
            *g = 2.0 * self.lambda_pair * w;
        }
        penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn pair_coefficient_scales_with_ncol() {
        let reg = L2::new(10.0, 0.2, 11, None);
        assert_approx_eq!(f64, reg.lambda_pair, 2.0);
    }

    #[test]
    fn penalty_is_zero_at_the_center() {
        let ncol = 3;
        let center = vec![0.5; ncol * NUM_AA];
        let params = PottsParams::from_centering(ncol, &center);
        let reg = L2::new(10.0, 0.2, ncol, Some(center));

        let mut grad = PottsParams::zeroed(ncol);
        let penalty = reg.apply_into(&params, &mut grad);
        assert_approx_eq!(f64, penalty, 0.0);
        assert!(grad.v.iter().all(|&g| g == 0.0));
        assert!(grad.w.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let ncol = 2;
        let mut params = PottsParams::zeroed(ncol);
        params.set_v(0, 3, 0.7);
        params.set_w(0, 1, 2, 4, -0.3);
        params.set_w(1, 0, 4, 2, -0.3);

        let reg = L2::new(5.0, 0.1, ncol, None);
        let mut grad = PottsParams::zeroed(ncol);
        let base = reg.apply_into(&params, &mut grad);

        let h = 1e-6;
        let mut shifted = params.clone();
        shifted.set_v(0, 3, 0.7 + h);
        let mut scratch = PottsParams::zeroed(ncol);
        let plus = reg.apply_into(&shifted, &mut scratch);
        let numeric = (plus - base) / h;
        assert_approx_eq!(f64, grad.v(0, 3), numeric, epsilon = 1e-4);
    }

    #[test]
    fn halved_pair_penalty() {
        let mut reg = L2::new(10.0, 0.2, 11, None);
        reg.scale_pair(0.5);
        assert_approx_eq!(f64, reg.lambda_pair, 1.0);
    }
}
