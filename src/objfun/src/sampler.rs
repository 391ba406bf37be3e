use rayon::prelude::*;

use alignment::alphabet::{GAP, NUM_AA};
use alignment::Msa;
use potts::PottsParams;

use crate::tree::FlatTree;

/// Gibbs sampler over Potts model states.
///
/// Only the twenty amino-acid states are ever drawn: a position currently
/// holding a gap is left untouched, so the gap pattern of the chain is
/// invariant and the per-column amino-acid count mass is conserved. Gaps
/// still act as conditioning symbols through the pair potentials.
///
/// The sampler owns its random number generator; a fixed seed yields
/// identical samples on every run. Parallel operations derive one child
/// seed per sequence from the master generator before fanning out, so the
/// output does not depend on the thread count either.
#[derive(Debug)]
pub struct Sampler {
    rng: fastrand::Rng,
}

impl Sampler {
    #[must_use]
    pub fn new() -> Self {
        Self { rng: fastrand::Rng::new() }
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: fastrand::Rng::with_seed(seed) }
    }

    /// Run `sweeps` full Gibbs sweeps over every sequence of `msa`.
    ///
    /// One sweep resamples every non-gap position of a sequence, in column
    /// order, from its full conditional under `params`.
    pub fn gibbs_sweeps(&mut self, params: &PottsParams, msa: &mut Msa, sweeps: usize) {
        let seeds: Vec<u64> = (0..msa.nrow()).map(|_| self.rng.u64(..)).collect();
        msa.par_rows_mut()
            .zip(seeds.into_par_iter())
            .for_each(|(row, seed)| {
                let mut rng = fastrand::Rng::with_seed(seed);
                gibbs_sweep_row(params, row, sweeps, &mut rng);
            });
    }

    /// Resample a single uniformly chosen position in every sequence.
    pub fn resample_single_position(&mut self, params: &PottsParams, msa: &mut Msa) {
        let ncol = msa.ncol();
        let draws: Vec<(usize, u64)> = (0..msa.nrow())
            .map(|_| (self.rng.usize(..ncol), self.rng.u64(..)))
            .collect();
        msa.par_rows_mut()
            .zip(draws.into_par_iter())
            .for_each(|(row, (position, seed))| {
                let mut rng = fastrand::Rng::with_seed(seed);
                resample_position(params, row, position, &mut rng);
            });
    }

    /// Mutate a root sequence along a flattened tree, collecting the leaf
    /// sequences into `leaves` (BFS order).
    ///
    /// Each child copies its parent and undergoes `round(mutation_rate * l)`
    /// Gibbs sweeps, where `l` is the child's branch length. `vertices` is a
    /// caller-owned scratch buffer of `n_vertices * ncol` states.
    ///
    /// The traversal is sequential: every child depends on its parent, and a
    /// single generator keeps the output reproducible.
    pub fn mutate_along_tree(
        &mut self,
        params: &PottsParams,
        tree: &FlatTree,
        seq0: &[u8],
        mutation_rate: f64,
        vertices: &mut [u8],
        leaves: &mut Msa,
    ) {
        let ncol = seq0.len();
        debug_assert_eq!(vertices.len(), tree.n_vertices() * ncol);
        debug_assert_eq!(leaves.nrow(), tree.n_leaves());

        vertices[..ncol].copy_from_slice(seq0);

        let mut cursor = 1;
        let mut leaf = 0;
        for vertex in 0..tree.n_vertices() {
            let n_children = tree.n_children(vertex);
            if n_children == 0 {
                leaves.row_mut(leaf).copy_from_slice(&vertices[vertex * ncol..(vertex + 1) * ncol]);
                leaf += 1;
                continue;
            }
            for _ in 0..n_children {
                let child = cursor;
                cursor += 1;

                let (parents, rest) = vertices.split_at_mut(child * ncol);
                let parent = &parents[vertex * ncol..(vertex + 1) * ncol];
                let child_row = &mut rest[..ncol];
                child_row.copy_from_slice(parent);

                let sweeps = (mutation_rate * tree.branch_length(child)).round() as usize;
                gibbs_sweep_row(params, child_row, sweeps, &mut self.rng);
            }
        }
        debug_assert_eq!(leaf, tree.n_leaves());
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Sweep a single sequence `sweeps` times.
pub fn gibbs_sweep_row(params: &PottsParams, row: &mut [u8], sweeps: usize, rng: &mut fastrand::Rng) {
    for _ in 0..sweeps {
        for i in 0..row.len() {
            resample_position(params, row, i, rng);
        }
    }
}

/// Resample `row[i]` from its full conditional. Gap positions are frozen.
#[inline]
pub fn resample_position(params: &PottsParams, row: &mut [u8], i: usize, rng: &mut fastrand::Rng) {
    if row[i] == GAP {
        return;
    }
    let mut logits = [0.0; NUM_AA];
    fill_aa_logits(params, row, i, &mut logits);
    row[i] = draw_state(&logits, rng);
}

/// Amino-acid conditional logits
/// `z_a = v[i,a] + sum_{j != i} w[i,j,a,row[j]]` for `a = 0..20`.
/// Gaps in the context enter through the pair potentials' gap column.
#[inline]
pub fn fill_aa_logits(params: &PottsParams, row: &[u8], i: usize, logits: &mut [f64; NUM_AA]) {
    for (a, logit) in logits.iter_mut().enumerate() {
        *logit = params.v(i, a);
    }
    for (j, &b) in row.iter().enumerate() {
        if j == i {
            continue;
        }
        let b = b as usize;
        for (a, logit) in logits.iter_mut().enumerate() {
            *logit += params.w(i, j, a, b);
        }
    }
}

/// Inverse-CDF draw from unnormalized logits. The maximum logit is
/// subtracted before exponentiation.
#[inline]
pub fn draw_state(logits: &[f64; NUM_AA], rng: &mut fastrand::Rng) -> u8 {
    let zmax = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut cumulative = [0.0; NUM_AA];
    let mut total = 0.0;
    for (a, &z) in logits.iter().enumerate() {
        total += (z - zmax).exp();
        cumulative[a] = total;
    }

    let r = rng.f64() * total;
    cumulative
        .iter()
        .position(|&c| r < c)
        .unwrap_or(NUM_AA - 1) as u8
}
