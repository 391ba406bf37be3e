//! Entropy-based local correction of coupling scores.
//!
//! Builds per-column statistics `u[i,a]` from the single-site frequencies,
//! forms their pairwise products, and subtracts them from the coupling
//! scores after a least-squares fit of the scale `eta`.

use log::info;

use alignment::counts::single_idx;
use alignment::Frequencies;

use crate::{frobenius_score, squared_coupling_norm};

/// Correction configuration.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionOptions {
    /// Use the column entropy `f log2 f` instead of the scaled variance
    /// `sqrt(Neff)/lambda_w * f (1 - f)`.
    pub entropy: bool,
    /// Fit and subtract in squared-norm space; otherwise in Frobenius space.
    pub squared: bool,
    /// Restrict the statistic to 20 amino acids or extend it to 21 states.
    pub nr_states: usize,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self { entropy: false, squared: true, nr_states: 20 }
    }
}

/// A corrected score matrix together with the fitted scale.
#[derive(Debug, Clone)]
pub struct CorrectedScores {
    pub eta: f64,
    pub matrix: Vec<f64>,
}

/// Compute the entropy-corrected contact scores.
///
/// In squared mode the least-squares fit minimizes
/// `sum_ij (|w_ij|^2 - eta * u_i u_j)^2`, giving
/// `eta = sum_ij |w_ij|^2 (s_i s_j) / sum_ij (q_i q_j)` with
/// `s_i = sum_a u[i,a]` and `q_i = sum_a u[i,a]^2`; the corrected matrix is
/// `|w_ij|^2 - eta * s_i s_j`. Linear mode fits and subtracts in Frobenius
/// space instead.
#[must_use]
pub fn local_correction(
    freqs: &Frequencies,
    lambda_pair: f64,
    w: &[f64],
    opts: CorrectionOptions,
) -> CorrectedScores {
    let ncol = freqs.ncol;
    info!(
        "Applying {} correction over {} states ({} fit)",
        if opts.entropy { "entropy" } else { "count-variance" },
        opts.nr_states,
        if opts.squared { "squared" } else { "linear" },
    );

    let u = column_statistics(freqs, lambda_pair, opts);
    let sums: Vec<f64> = u.iter().map(|col| col.iter().sum()).collect();
    let square_sums: Vec<f64> = u.iter().map(|col| col.iter().map(|x| x * x).sum()).collect();

    let mut eta_num = 0.0;
    let mut eta_den = 0.0;
    for i in 0..ncol {
        for j in 0..ncol {
            let coupling = squared_coupling_norm(w, ncol, i, j);
            if opts.squared {
                eta_num += coupling * sums[i] * sums[j];
                eta_den += square_sums[i] * square_sums[j];
            } else {
                eta_num += coupling.sqrt() * (sums[i] * sums[j]).sqrt();
                eta_den += sums[i] * sums[j];
            }
        }
    }
    let eta = eta_num / eta_den;

    let matrix = if opts.squared {
        let mut mat = vec![0.0; ncol * ncol];
        for i in 0..ncol {
            for j in 0..ncol {
                mat[i * ncol + j] = squared_coupling_norm(w, ncol, i, j) - eta * sums[i] * sums[j];
            }
        }
        mat
    } else {
        let mut mat = frobenius_score(w, ncol);
        for i in 0..ncol {
            for j in 0..ncol {
                mat[i * ncol + j] -= eta * (sums[i] * sums[j]).sqrt();
            }
        }
        mat
    };

    CorrectedScores { eta, matrix }
}

/// `u[i][a]` for `a` below `nr_states`.
fn column_statistics(freqs: &Frequencies, lambda_pair: f64, opts: CorrectionOptions) -> Vec<Vec<f64>> {
    let scale = if opts.entropy { 1.0 } else { freqs.neff.sqrt() / lambda_pair };

    (0..freqs.ncol)
        .map(|i| {
            (0..opts.nr_states)
                .map(|a| {
                    let f = freqs.single[single_idx(i, a)];
                    if opts.entropy {
                        if f > 0.0 { f * f.log2() } else { 0.0 }
                    } else {
                        scale * f * (1.0 - f)
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::alphabet::NUM_STATES;
    use alignment::counts::pair_idx;
    use alignment::msa::Msa;
    use alignment::pseudocounts::{self, PseudocountMode};
    use float_cmp::assert_approx_eq;

    fn toy_freqs() -> Frequencies {
        let msa = Msa::from_chars(&["ARND", "ARNC", "QRGH", "QEGH"]).unwrap();
        let weights = vec![1.0; 4];
        pseudocounts::calculate_frequencies(&msa, &weights, PseudocountMode::Constant, 1.0, None)
    }

    fn toy_couplings(ncol: usize, seed: u64) -> Vec<f64> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut w = vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES];
        for i in 0..ncol {
            for j in (i + 1)..ncol {
                for a in 0..20 {
                    for b in 0..20 {
                        let value = 0.3 * (rng.f64() - 0.5);
                        w[pair_idx(ncol, i, j, a, b)] = value;
                        w[pair_idx(ncol, j, i, b, a)] = value;
                    }
                }
            }
        }
        w
    }

    #[test]
    fn eta_scales_with_the_couplings() {
        let freqs = toy_freqs();
        let w = toy_couplings(freqs.ncol, 9);
        let doubled: Vec<f64> = w.iter().map(|x| x * 2.0).collect();

        let base = local_correction(&freqs, 0.2, &w, CorrectionOptions::default());
        let scaled = local_correction(&freqs, 0.2, &doubled, CorrectionOptions::default());
        // Squared mode: |2w|^2 = 4 |w|^2, and eta is linear in it.
        assert_approx_eq!(f64, scaled.eta, 4.0 * base.eta, epsilon = 1e-10);
    }

    #[test]
    fn corrected_matrix_matches_its_definition() {
        let freqs = toy_freqs();
        let ncol = freqs.ncol;
        let lambda_pair = 0.2;
        let w = toy_couplings(ncol, 9);

        let corrected = local_correction(&freqs, lambda_pair, &w, CorrectionOptions::default());

        // Recompute the column statistic independently (variance mode).
        let scale = freqs.neff.sqrt() / lambda_pair;
        let sums: Vec<f64> = (0..ncol)
            .map(|i| {
                (0..20)
                    .map(|a| {
                        let f = freqs.f1(i, a);
                        scale * f * (1.0 - f)
                    })
                    .sum()
            })
            .collect();

        for i in 0..ncol {
            for j in 0..ncol {
                let expected =
                    squared_coupling_norm(&w, ncol, i, j) - corrected.eta * sums[i] * sums[j];
                assert_approx_eq!(f64, corrected.matrix[i * ncol + j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn linear_mode_subtracts_in_frobenius_space() {
        let freqs = toy_freqs();
        let w = toy_couplings(freqs.ncol, 4);
        let opts = CorrectionOptions { squared: false, ..CorrectionOptions::default() };
        let corrected = local_correction(&freqs, 0.2, &w, opts);

        let frobenius = frobenius_score(&w, freqs.ncol);
        // Every corrected entry is the Frobenius score shifted by a
        // nonnegative background term.
        for (c, f) in corrected.matrix.iter().zip(frobenius.iter()) {
            assert!(c <= f);
        }
        assert!(corrected.eta > 0.0);
    }
}
