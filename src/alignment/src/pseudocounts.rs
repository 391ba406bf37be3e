use lazy_static::lazy_static;

use crate::alphabet::{NUM_AA, NUM_STATES};
use crate::counts::{self, pair_idx, single_idx};
use crate::msa::Msa;
use crate::weighting;

/// Pseudocount strategy applied to the empirical frequency tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PseudocountMode {
    /// Admix substitution-matrix conditional probabilities (default).
    SubstitutionMatrix,
    /// Admix a uniform amino-acid distribution.
    Constant,
    /// Raw frequencies.
    None,
}

/// Pseudocounted single and pair frequencies, plus the effective
/// sequence count they were derived from.
#[derive(Debug, Clone)]
pub struct Frequencies {
    pub ncol: usize,
    pub neff: f64,
    /// `f1[L][21]`, flat.
    pub single: Vec<f64>,
    /// `f2[L][L][21][21]`, flat.
    pub pair: Vec<f64>,
}

impl Frequencies {
    #[inline]
    #[must_use]
    pub fn f1(&self, i: usize, a: usize) -> f64 {
        self.single[single_idx(i, a)]
    }

    #[inline]
    #[must_use]
    pub fn f2(&self, i: usize, j: usize, a: usize, b: usize) -> f64 {
        self.pair[pair_idx(self.ncol, i, j, a, b)]
    }
}

/// Compute pseudocounted frequencies from a weighted alignment.
///
/// `pc_single_count` is the pseudocount mass `N` of the CLI; the pair table
/// uses `pc_pair_count` when provided and the single count otherwise.
#[must_use]
pub fn calculate_frequencies(
    msa: &Msa,
    weights: &[f64],
    mode: PseudocountMode,
    pc_single_count: f64,
    pc_pair_count: Option<f64>,
) -> Frequencies {
    let ncol = msa.ncol();
    let neff = weighting::neff(weights);
    let (c1, c2) = counts::both_counts(msa, weights);
    let pc_pair = pc_pair_count.unwrap_or(pc_single_count);

    // Raw frequencies.
    let mut f1: Vec<f64> = c1.iter().map(|c| c / neff).collect();
    let mut f2: Vec<f64> = c2.iter().map(|c| c / neff).collect();

    match mode {
        PseudocountMode::None => (),
        PseudocountMode::Constant => {
            admix_constant_single(&mut f1, ncol, neff, pc_single_count);
            admix_constant_pair(&mut f2, &f1, ncol, neff, pc_pair);
        }
        PseudocountMode::SubstitutionMatrix => {
            admix_submat_single(&mut f1, ncol, neff, pc_single_count);
            admix_pair_from_singles(&mut f2, &f1, ncol, neff, pc_pair);
        }
    }

    Frequencies { ncol, neff, single: f1, pair: f2 }
}

/// Constant pseudocounts: `f'[i,a] = (1 - tau) f[i,a] + tau (1 - f_gap[i]) / 20`
/// over the amino acids, with `tau = pc / (Neff + pc)`.
///
/// The gap frequency is left untouched so that the per-column amino-acid
/// mass is preserved (contrastive divergence relies on that mass being
/// conserved between data and sampled counts).
fn admix_constant_single(f1: &mut [f64], ncol: usize, neff: f64, pc: f64) {
    let tau = pc / (neff + pc);
    for i in 0..ncol {
        let aa_mass = 1.0 - f1[single_idx(i, NUM_AA)];
        let uniform = aa_mass / NUM_AA as f64;
        for a in 0..NUM_AA {
            let idx = single_idx(i, a);
            f1[idx] = (1.0 - tau) * f1[idx] + tau * uniform;
        }
    }
}

/// Constant pair pseudocounts mix toward the product of per-column uniform
/// amino-acid priors (gap marginals preserved).
fn admix_constant_pair(f2: &mut [f64], f1: &[f64], ncol: usize, neff: f64, pc: f64) {
    let tau = pc / (neff + pc);
    let priors: Vec<f64> = (0..ncol)
        .map(|i| (1.0 - f1[single_idx(i, NUM_AA)]) / NUM_AA as f64)
        .collect();

    for i in 0..ncol {
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    let idx = pair_idx(ncol, i, j, a, b);
                    let prior_a = if a < NUM_AA { priors[i] } else { f1[single_idx(i, NUM_AA)] };
                    let prior_b = if b < NUM_AA { priors[j] } else { f1[single_idx(j, NUM_AA)] };
                    f2[idx] = (1.0 - tau) * f2[idx] + tau * prior_a * prior_b;
                }
            }
        }
    }
}

/// Substitution-matrix pseudocounts on the single table:
/// `f'[i,a] = (1 - tau) f[i,a] + tau sum_b P(a|b) f[i,b]` over amino acids,
/// with `tau = pc / (Neff + pc)`. The gap frequency is left untouched.
fn admix_submat_single(f1: &mut [f64], ncol: usize, neff: f64, pc: f64) {
    let tau = pc / (neff + pc);
    let cond = &*SUBMAT_CONDITIONAL;

    for i in 0..ncol {
        let row: Vec<f64> = (0..NUM_AA).map(|a| f1[single_idx(i, a)]).collect();
        for a in 0..NUM_AA {
            let prior: f64 = (0..NUM_AA).map(|b| cond[a][b] * row[b]).sum();
            f1[single_idx(i, a)] = (1.0 - tau) * row[a] + tau * prior;
        }
    }
}

/// Pair pseudocounts mix the raw pair frequencies with the product of the
/// pseudocounted singles.
fn admix_pair_from_singles(f2: &mut [f64], f1: &[f64], ncol: usize, neff: f64, pc: f64) {
    let tau = pc / (neff + pc);
    for i in 0..ncol {
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    let idx = pair_idx(ncol, i, j, a, b);
                    let prior = f1[single_idx(i, a)] * f1[single_idx(j, b)];
                    f2[idx] = (1.0 - tau) * f2[idx] + tau * prior;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Substitution-matrix tables.
// ---------------------------------------------------------------------------

/// BLOSUM62 half-bit scores, amino acids ordered as `alphabet::AMINO_ACIDS`.
const BLOSUM62: [[i8; 20]; 20] = [
    [ 4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0],
    [-1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3],
    [-2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3],
    [-2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3],
    [ 0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1],
    [-1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2],
    [-1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2],
    [ 0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3],
    [-2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3],
    [-1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3],
    [-1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1],
    [-1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2],
    [-1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1],
    [-2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1],
    [-1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2],
    [ 1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2],
    [ 0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0],
    [-3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3],
    [-2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1],
    [ 0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4],
];

/// Robinson & Robinson amino-acid background frequencies, same ordering.
const BACKGROUND: [f64; 20] = [
    0.078047, 0.051269, 0.044873, 0.053640, 0.019246, 0.042644, 0.062949,
    0.073772, 0.021992, 0.051420, 0.090191, 0.057438, 0.022425, 0.038556,
    0.052028, 0.071198, 0.058413, 0.013298, 0.032165, 0.064409,
];

lazy_static! {
    /// Conditional substitution probabilities `P(a|b)` derived from the
    /// BLOSUM62 target distribution `q(a,b) ~ p_a p_b 2^(s_ab / 2)`.
    static ref SUBMAT_CONDITIONAL: [[f64; 20]; 20] = {
        let mut joint = [[0.0; 20]; 20];
        for a in 0..20 {
            for b in 0..20 {
                joint[a][b] =
                    BACKGROUND[a] * BACKGROUND[b] * f64::powf(2.0, f64::from(BLOSUM62[a][b]) / 2.0);
            }
        }
        let mut cond = [[0.0; 20]; 20];
        for b in 0..20 {
            let marginal: f64 = (0..20).map(|a| joint[a][b]).sum();
            for a in 0..20 {
                cond[a][b] = joint[a][b] / marginal;
            }
        }
        cond
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::GAP;
    use float_cmp::assert_approx_eq;

    fn toy() -> (Msa, Vec<f64>) {
        let msa = Msa::from_rows(vec![vec![0, 1, 2, 3], vec![0, 1, 2, 3]]).unwrap();
        (msa, vec![1.0, 1.0])
    }

    #[test]
    fn no_pseudocounts_are_raw_frequencies() {
        let (msa, w) = toy();
        let freqs = calculate_frequencies(&msa, &w, PseudocountMode::None, 1.0, None);
        assert_approx_eq!(f64, freqs.f1(0, 0), 1.0);
        assert_approx_eq!(f64, freqs.f1(0, 1), 0.0);
        assert_approx_eq!(f64, freqs.f2(0, 1, 0, 1), 1.0);
    }

    #[test]
    fn single_frequencies_stay_normalized() {
        let (msa, w) = toy();
        for mode in [PseudocountMode::Constant, PseudocountMode::SubstitutionMatrix] {
            let freqs = calculate_frequencies(&msa, &w, mode, 1.0, None);
            for i in 0..msa.ncol() {
                let total: f64 = (0..NUM_STATES).map(|a| freqs.f1(i, a)).sum();
                assert_approx_eq!(f64, total, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn constant_pseudocounts_make_amino_acid_frequencies_positive() {
        let (msa, w) = toy();
        let freqs = calculate_frequencies(&msa, &w, PseudocountMode::Constant, 1.0, None);
        for i in 0..msa.ncol() {
            for a in 0..NUM_AA {
                assert!(freqs.f1(i, a) > 0.0);
            }
        }
    }

    #[test]
    fn pseudocounts_preserve_the_gap_mass() {
        let msa = Msa::from_rows(vec![vec![0, GAP], vec![1, GAP], vec![2, 3]]).unwrap();
        let w = vec![1.0; 3];
        for mode in [PseudocountMode::Constant, PseudocountMode::SubstitutionMatrix] {
            let freqs = calculate_frequencies(&msa, &w, mode, 1.0, None);
            assert_approx_eq!(f64, freqs.f1(1, GAP as usize), 2.0 / 3.0, epsilon = 1e-12);
            assert_approx_eq!(f64, freqs.f1(0, GAP as usize), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn submat_leaves_gap_frequency_untouched() {
        let msa = Msa::from_rows(vec![vec![0, GAP], vec![0, GAP]]).unwrap();
        let w = vec![1.0, 1.0];
        let freqs = calculate_frequencies(&msa, &w, PseudocountMode::SubstitutionMatrix, 1.0, None);
        assert_approx_eq!(f64, freqs.f1(1, GAP as usize), 1.0);
    }

    #[test]
    fn conditional_matrix_columns_sum_to_one() {
        for b in 0..20 {
            let total: f64 = (0..20).map(|a| SUBMAT_CONDITIONAL[a][b]).sum();
            assert_approx_eq!(f64, total, 1.0, epsilon = 1e-12);
        }
    }
}
