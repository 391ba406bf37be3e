//! Contact score post-processing over learned pair potentials.
//!
//! Every function here consumes the flat `L x L x 21 x 21` coupling tensor
//! (see [`alignment::counts::pair_idx`]) and produces flat `L x L` score
//! matrices.

use rayon::prelude::*;

use alignment::alphabet::NUM_AA;
use alignment::counts::pair_idx;

pub mod entropy;
pub mod triplets;

/// Frobenius norm of the 20 x 20 amino-acid block of every coupling:
/// `S[i,j] = sqrt(sum_ab w[i,j,a,b]^2)`. The diagonal is zero because the
/// diagonal coupling blocks are zero by construction.
#[must_use]
pub fn frobenius_score(w: &[f64], ncol: usize) -> Vec<f64> {
    let mut mat = vec![0.0; ncol * ncol];
    mat.par_chunks_exact_mut(ncol).enumerate().for_each(|(i, row)| {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = squared_coupling_norm(w, ncol, i, j).sqrt();
        }
    });
    mat
}

/// `sum_ab w[i,j,a,b]^2` over the amino-acid block.
#[must_use]
pub fn squared_coupling_norm(w: &[f64], ncol: usize, i: usize, j: usize) -> f64 {
    let mut total = 0.0;
    for a in 0..NUM_AA {
        for b in 0..NUM_AA {
            let value = w[pair_idx(ncol, i, j, a, b)];
            total += value * value;
        }
    }
    total
}

/// Average product correction:
/// `S'[i,j] = S[i,j] - mean_i(S) * mean_j(S) / mean(S)`.
///
/// The corrected matrix has (numerically) zero mean.
#[must_use]
pub fn apc(mat: &[f64], ncol: usize) -> Vec<f64> {
    debug_assert_eq!(mat.len(), ncol * ncol);

    let grand_mean = mat.iter().sum::<f64>() / (ncol * ncol) as f64;
    let col_means: Vec<f64> = (0..ncol)
        .map(|j| (0..ncol).map(|i| mat[i * ncol + j]).sum::<f64>() / ncol as f64)
        .collect();

    let mut corrected = vec![0.0; ncol * ncol];
    for i in 0..ncol {
        for j in 0..ncol {
            corrected[i * ncol + j] = mat[i * ncol + j] - col_means[i] * col_means[j] / grand_mean;
        }
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::alphabet::NUM_STATES;
    use float_cmp::assert_approx_eq;

    fn toy_couplings(ncol: usize) -> Vec<f64> {
        let mut w = vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES];
        // w[0,1,2,3] = 3, w[0,1,4,4] = 4 -> Frobenius = 5.
        w[pair_idx(ncol, 0, 1, 2, 3)] = 3.0;
        w[pair_idx(ncol, 1, 0, 3, 2)] = 3.0;
        w[pair_idx(ncol, 0, 1, 4, 4)] = 4.0;
        w[pair_idx(ncol, 1, 0, 4, 4)] = 4.0;
        // Gap entries must not contribute to the score.
        w[pair_idx(ncol, 0, 1, 20, 5)] = 100.0;
        w[pair_idx(ncol, 0, 2, 7, 20)] = 100.0;
        w
    }

    #[test]
    fn frobenius_of_known_couplings() {
        let w = toy_couplings(3);
        let mat = frobenius_score(&w, 3);
        assert_approx_eq!(f64, mat[1], 5.0); // (0, 1)
        assert_approx_eq!(f64, mat[3], 5.0); // (1, 0)
        assert_approx_eq!(f64, mat[2], 0.0); // gap-only block (0, 2)
    }

    #[test]
    fn frobenius_is_nonnegative_and_zero_diagonal() {
        let mut rng = fastrand::Rng::with_seed(77);
        let ncol = 4;
        let mut w = vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES];
        w.iter_mut().for_each(|x| *x = rng.f64() - 0.5);
        for i in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    w[pair_idx(ncol, i, i, a, b)] = 0.0;
                }
            }
        }

        let mat = frobenius_score(&w, ncol);
        assert!(mat.iter().all(|&s| s >= 0.0));
        for i in 0..ncol {
            assert_approx_eq!(f64, mat[i * ncol + i], 0.0);
        }
    }

    #[test]
    fn apc_by_hand() {
        // S = [[0, 2], [2, 0]]: row means [1, 1], grand mean 1,
        // correction term all ones -> [[-1, 1], [1, -1]].
        let mat = vec![0.0, 2.0, 2.0, 0.0];
        let corrected = apc(&mat, 2);
        assert_approx_eq!(f64, corrected[0], -1.0);
        assert_approx_eq!(f64, corrected[1], 1.0);
        assert_approx_eq!(f64, corrected[2], 1.0);
        assert_approx_eq!(f64, corrected[3], -1.0);
    }

    #[test]
    fn apc_has_zero_mean() {
        let mut rng = fastrand::Rng::with_seed(3);
        let ncol = 6;
        let mut mat = vec![0.0; ncol * ncol];
        for i in 0..ncol {
            for j in (i + 1)..ncol {
                let value = rng.f64() * 3.0;
                mat[i * ncol + j] = value;
                mat[j * ncol + i] = value;
            }
        }

        let corrected = apc(&mat, ncol);
        let mean = corrected.iter().sum::<f64>() / (ncol * ncol) as f64;
        assert!(mean.abs() < 1e-8);
    }
}
