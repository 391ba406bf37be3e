use rayon::prelude::*;

use crate::alphabet::NUM_STATES;
use crate::msa::Msa;

/// Flat index into a single-site `L x 21` table.
#[inline]
#[must_use]
pub fn single_idx(i: usize, a: usize) -> usize {
    i * NUM_STATES + a
}

/// Flat index into a pair `L x L x 21 x 21` tensor.
#[inline]
#[must_use]
pub fn pair_idx(ncol: usize, i: usize, j: usize, a: usize, b: usize) -> usize {
    ((i * ncol + j) * NUM_STATES + a) * NUM_STATES + b
}

/// Weighted single-site state counts `c1[L][21]`.
#[must_use]
pub fn single_counts(msa: &Msa, weights: &[f64]) -> Vec<f64> {
    let mut counts = vec![0.0; msa.ncol() * NUM_STATES];
    single_counts_into(msa, weights, &mut counts);
    counts
}

/// In-place variant of [`single_counts`] for callers that recycle buffers.
pub fn single_counts_into(msa: &Msa, weights: &[f64], counts: &mut [f64]) {
    debug_assert_eq!(counts.len(), msa.ncol() * NUM_STATES);
    counts.iter_mut().for_each(|c| *c = 0.0);
    for (row, &w) in msa.rows().zip(weights.iter()) {
        for (i, &a) in row.iter().enumerate() {
            counts[single_idx(i, a as usize)] += w;
        }
    }
}

/// Weighted pair state counts `c2[L][L][21][21]`.
///
/// The full tensor is materialized, diagonal included; the diagonal blocks
/// hold the single counts on their `(a, a)` entries. Symmetry
/// `c2[i,j,a,b] = c2[j,i,b,a]` holds by construction.
///
/// Accumulation is parallel over the first column index: each `i` owns the
/// disjoint slice `c2[i, .., .., ..]`, and rows are folded in order, which
/// keeps the result independent of the thread count.
#[must_use]
pub fn pair_counts(msa: &Msa, weights: &[f64]) -> Vec<f64> {
    let mut counts = vec![0.0; msa.ncol() * msa.ncol() * NUM_STATES * NUM_STATES];
    pair_counts_into(msa, weights, &mut counts);
    counts
}

/// In-place variant of [`pair_counts`] for callers that recycle buffers.
pub fn pair_counts_into(msa: &Msa, weights: &[f64], counts: &mut [f64]) {
    let ncol = msa.ncol();
    let block = ncol * NUM_STATES * NUM_STATES;
    debug_assert_eq!(counts.len(), ncol * block);

    counts.par_chunks_exact_mut(block).enumerate().for_each(|(i, slice)| {
        slice.iter_mut().for_each(|c| *c = 0.0);
        for (row, &w) in msa.rows().zip(weights.iter()) {
            let a = row[i] as usize;
            for (j, &b) in row.iter().enumerate() {
                slice[(j * NUM_STATES + a) * NUM_STATES + b as usize] += w;
            }
        }
    });
}

/// Both count tables in one call.
#[must_use]
pub fn both_counts(msa: &Msa, weights: &[f64]) -> (Vec<f64>, Vec<f64>) {
    (single_counts(msa, weights), pair_counts(msa, weights))
}

/// Zero the gap row and column of a single-site table.
pub fn zero_single_gaps(c1: &mut [f64], ncol: usize) {
    for i in 0..ncol {
        c1[single_idx(i, NUM_STATES - 1)] = 0.0;
    }
}

/// Zero the gap rows and columns of a pair tensor.
pub fn zero_pair_gaps(c2: &mut [f64], ncol: usize) {
    let gap = NUM_STATES - 1;
    for i in 0..ncol {
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                c2[pair_idx(ncol, i, j, a, gap)] = 0.0;
                c2[pair_idx(ncol, i, j, gap, a)] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::GAP;
    use float_cmp::assert_approx_eq;

    fn toy_msa() -> (Msa, Vec<f64>) {
        let msa = Msa::from_rows(vec![vec![0, 1, 2], vec![0, 1, GAP]]).unwrap();
        (msa, vec![0.5, 1.5])
    }

    #[test]
    fn single_counts_accumulate_weights() {
        let (msa, w) = toy_msa();
        let c1 = single_counts(&msa, &w);
        assert_approx_eq!(f64, c1[single_idx(0, 0)], 2.0);
        assert_approx_eq!(f64, c1[single_idx(2, 2)], 0.5);
        assert_approx_eq!(f64, c1[single_idx(2, GAP as usize)], 1.5);
    }

    #[test]
    fn pair_counts_are_symmetric() {
        let (msa, w) = toy_msa();
        let c2 = pair_counts(&msa, &w);
        let ncol = msa.ncol();
        for i in 0..ncol {
            for j in 0..ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        assert_approx_eq!(
                            f64,
                            c2[pair_idx(ncol, i, j, a, b)],
                            c2[pair_idx(ncol, j, i, b, a)]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn pair_count_values() {
        let (msa, w) = toy_msa();
        let c2 = pair_counts(&msa, &w);
        let ncol = msa.ncol();
        // Both rows carry (0, 1) at columns (0, 1).
        assert_approx_eq!(f64, c2[pair_idx(ncol, 0, 1, 0, 1)], 2.0);
        // Only the second row pairs state 0 with a gap at column 2.
        assert_approx_eq!(f64, c2[pair_idx(ncol, 0, 2, 0, GAP as usize)], 1.5);
    }

    #[test]
    fn gap_zeroing() {
        let (msa, w) = toy_msa();
        let (mut c1, mut c2) = both_counts(&msa, &w);
        let ncol = msa.ncol();
        zero_single_gaps(&mut c1, ncol);
        zero_pair_gaps(&mut c2, ncol);
        assert_approx_eq!(f64, c1[single_idx(2, GAP as usize)], 0.0);
        assert_approx_eq!(f64, c2[pair_idx(ncol, 0, 2, 0, GAP as usize)], 0.0);
        assert_approx_eq!(f64, c2[pair_idx(ncol, 2, 0, GAP as usize, 0)], 0.0);
    }
}
