//! Ranking of column triplets from learned pair couplings.
//!
//! A pair transform turns every coupling block into a scalar; the picking
//! strategy then assembles high-scoring `(i, j, k)` triplets from the
//! transformed pair matrix.

use itertools::Itertools;
use thiserror::Error;

use crate::{frobenius_score, squared_coupling_norm};

/// Default cap on the number of reported triplets.
pub const DEFAULT_MAX_TRIPLETS: usize = 1000;

#[derive(Error, Debug)]
pub enum TripletError {
    #[error("Invalid triplet strategy '{0}' - valid choices: best-pairs")]
    UnknownStrategy(String),

    #[error("Invalid pair transform '{0}' - valid choices: frobenius, squared-frobenius")]
    UnknownTransform(String),
}

/// Triplet picking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripletStrategy {
    /// Extend the strongest pairs by their best-supported third column.
    BestPairs,
}

impl std::str::FromStr for TripletStrategy {
    type Err = TripletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-pairs" => Ok(Self::BestPairs),
            other => Err(TripletError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Scalarization of a coupling block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairTransform {
    Frobenius,
    SquaredFrobenius,
}

impl std::str::FromStr for PairTransform {
    type Err = TripletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frobenius" => Ok(Self::Frobenius),
            "squared-frobenius" => Ok(Self::SquaredFrobenius),
            other => Err(TripletError::UnknownTransform(other.to_string())),
        }
    }
}

/// A ranked column triplet, `i < j < k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Triplet {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub score: f64,
}

impl std::fmt::Display for Triplet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}\t{}\t{}\t{:.8e}", self.i, self.j, self.k, self.score)
    }
}

/// Pick up to `max_triplets` triplets from the coupling tensor.
#[must_use]
pub fn pick_triplets(
    w: &[f64],
    ncol: usize,
    strategy: TripletStrategy,
    transform: PairTransform,
    max_triplets: usize,
) -> Vec<Triplet> {
    let pair_scores = match transform {
        PairTransform::Frobenius => frobenius_score(w, ncol),
        PairTransform::SquaredFrobenius => {
            let mut mat = vec![0.0; ncol * ncol];
            for i in 0..ncol {
                for j in 0..ncol {
                    mat[i * ncol + j] = squared_coupling_norm(w, ncol, i, j);
                }
            }
            mat
        }
    };

    match strategy {
        TripletStrategy::BestPairs => best_pairs(&pair_scores, ncol, max_triplets),
    }
}

/// For every strong pair `(i, j)`, add the third column maximizing the
/// combined support `t(i,k) + t(j,k)`.
fn best_pairs(pair_scores: &[f64], ncol: usize, max_triplets: usize) -> Vec<Triplet> {
    if ncol < 3 {
        return Vec::new();
    }

    let ranked_pairs = (0..ncol)
        .tuple_combinations()
        .map(|(i, j)| (i, j, pair_scores[i * ncol + j]))
        .sorted_by(|a, b| b.2.total_cmp(&a.2))
        .take(max_triplets);

    let mut triplets: Vec<Triplet> = Vec::new();
    for (i, j, pair_score) in ranked_pairs {
        let Some((k, support)) = (0..ncol)
            .filter(|&k| k != i && k != j)
            .map(|k| (k, pair_scores[i * ncol + k] + pair_scores[j * ncol + k]))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };

        let mut indices = [i, j, k];
        indices.sort_unstable();
        let [i, j, k] = indices;
        if triplets.iter().any(|t| t.i == i && t.j == j && t.k == k) {
            continue;
        }
        triplets.push(Triplet { i, j, k, score: pair_score + support });
    }

    triplets.sort_by(|a, b| b.score.total_cmp(&a.score));
    triplets.truncate(max_triplets);
    triplets
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::alphabet::NUM_STATES;
    use alignment::counts::pair_idx;

    fn couplings_with(pairs: &[(usize, usize, f64)], ncol: usize) -> Vec<f64> {
        let mut w = vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES];
        for &(i, j, value) in pairs {
            w[pair_idx(ncol, i, j, 0, 0)] = value;
            w[pair_idx(ncol, j, i, 0, 0)] = value;
        }
        w
    }

    #[test]
    fn strongest_clique_ranks_first() {
        // Columns 0-1-2 form a strong triangle; column 3 is weakly coupled.
        let w = couplings_with(&[(0, 1, 3.0), (0, 2, 2.0), (1, 2, 2.5), (2, 3, 0.1)], 4);
        let triplets =
            pick_triplets(&w, 4, TripletStrategy::BestPairs, PairTransform::Frobenius, 10);

        assert!(!triplets.is_empty());
        let top = &triplets[0];
        assert_eq!((top.i, top.j, top.k), (0, 1, 2));
        assert!((top.score - 7.5).abs() < 1e-12);
    }

    #[test]
    fn duplicate_triplets_are_collapsed() {
        let w = couplings_with(&[(0, 1, 3.0), (0, 2, 2.0), (1, 2, 2.5)], 3);
        let triplets =
            pick_triplets(&w, 3, TripletStrategy::BestPairs, PairTransform::Frobenius, 10);
        // All three seed pairs extend to the same (0, 1, 2) triplet.
        assert_eq!(triplets.len(), 1);
    }

    #[test]
    fn too_few_columns_yield_nothing() {
        let w = couplings_with(&[(0, 1, 3.0)], 2);
        assert!(pick_triplets(&w, 2, TripletStrategy::BestPairs, PairTransform::Frobenius, 10)
            .is_empty());
    }

    #[test]
    fn selector_parsing() {
        assert!("best-pairs".parse::<TripletStrategy>().is_ok());
        assert!(matches!(
            "worst-pairs".parse::<TripletStrategy>(),
            Err(TripletError::UnknownStrategy(_))
        ));
        assert!("squared-frobenius".parse::<PairTransform>().is_ok());
        assert!(matches!(
            "identity".parse::<PairTransform>(),
            Err(TripletError::UnknownTransform(_))
        ));
    }
}
