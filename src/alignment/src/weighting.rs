use rayon::prelude::*;

use crate::msa::Msa;

/// Default pairwise-identity threshold above which two sequences are
/// considered members of the same cluster.
pub const DEFAULT_IDENTITY_CUTOFF: f64 = 0.8;

/// Simple sequence reweighting.
///
/// Each sequence receives weight `1 / n`, where `n` is the number of
/// alignment rows (itself included) sharing at least `cutoff` fractional
/// identity with it. Identity is counted over all columns, gaps included.
///
/// The pairwise scan is embarrassingly parallel over rows; every row only
/// reads the alignment, so the result is independent of the thread count.
#[must_use]
pub fn weights_simple(msa: &Msa, cutoff: f64) -> Vec<f64> {
    let ncol = msa.ncol();
    let min_matches = (cutoff * ncol as f64).ceil() as usize;

    (0..msa.nrow()).into_par_iter()
        .map(|s| {
            let reference = msa.row(s);
            let cluster_size = msa.rows()
                .filter(|other| {
                    let matches = reference.iter().zip(other.iter())
                        .filter(|(a, b)| a == b)
                        .count();
                    matches >= min_matches
                })
                .count();
            1.0 / cluster_size as f64
        })
        .collect()
}

/// Uniform weighting: every sequence counts as one observation.
#[must_use]
pub fn weights_uniform(msa: &Msa) -> Vec<f64> {
    vec![1.0; msa.nrow()]
}

/// Effective number of sequences.
#[must_use]
pub fn neff(weights: &[f64]) -> f64 {
    weights.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn uniform_weights() {
        let msa = Msa::from_chars(&["ARND", "CQEG"]).unwrap();
        assert_eq!(weights_uniform(&msa), vec![1.0, 1.0]);
    }

    #[test]
    fn identical_sequences_share_one_cluster() {
        let msa = Msa::from_chars(&["ARND", "ARND", "CQEG"]).unwrap();
        let w = weights_simple(&msa, DEFAULT_IDENTITY_CUTOFF);
        assert_approx_eq!(f64, w[0], 0.5);
        assert_approx_eq!(f64, w[1], 0.5);
        assert_approx_eq!(f64, w[2], 1.0);
        assert_approx_eq!(f64, neff(&w), 2.0);
    }

    #[test]
    fn divergent_sequences_keep_full_weight() {
        // 1/4 identity < 0.8 cutoff.
        let msa = Msa::from_chars(&["ARND", "AQEG"]).unwrap();
        let w = weights_simple(&msa, DEFAULT_IDENTITY_CUTOFF);
        assert_eq!(w, vec![1.0, 1.0]);
    }
}
