use log::info;

use alignment::alphabet::NUM_STATES;
use alignment::{Frequencies, Msa};
use ccm_io::raw::{Meta, RawPotts};
use potts::packing::cd as packing;
use potts::{L2, PottsParams};

use crate::cd::{data_counts, sampled_counts_gradient};
use crate::error::ObjFunError;
use crate::sampler::Sampler;
use crate::tree::{FlatTree, Tree};
use crate::ObjectiveFunction;

/// Default number of mutation sweeps per unit of branch length.
pub const DEFAULT_MUTATION_RATE: f64 = 20.0;

/// Tree-controlled contrastive divergence.
///
/// Model samples are not independent Gibbs chains: every evaluation mutates
/// an ancestral sequence along a rooted phylogeny, and the leaf sequences
/// form the sample alignment. The sample size is therefore fixed to the
/// number of leaves, and the pair regularization coefficient is halved to
/// compensate for the correlation between samples.
#[derive(Debug)]
pub struct TreeCd {
    nrow: usize,
    ncol: usize,
    reg: L2,
    sampler: Sampler,
    x0: Vec<f64>,

    tree: FlatTree,
    seq0: Vec<u8>,
    mutation_rate: f64,

    msa_sampled: Msa,
    weights_sampled: Vec<f64>,

    data_single: Vec<f64>,
    data_pair: Vec<f64>,

    // Fixed scratch buffers.
    vertices: Vec<u8>,
    params: PottsParams,
    grad: PottsParams,
    reg_grad: PottsParams,
    sample_single: Vec<f64>,
    sample_pair: Vec<f64>,
}

impl TreeCd {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msa: &Msa,
        freqs: &Frequencies,
        mut reg: L2,
        tree: Tree,
        seq0: Vec<u8>,
        id0: Option<&[String]>,
        mutation_rate: f64,
        seed: Option<u64>,
        init: Option<&RawPotts>,
    ) -> Result<Self, ObjFunError> {
        let ncol = msa.ncol();
        if seq0.len() != ncol {
            return Err(ObjFunError::AncestorLengthMismatch { msa_ncol: ncol, seq_ncol: seq0.len() });
        }

        reg.scale_pair(0.5);

        let tree = match id0 {
            Some(ids) if !ids.is_empty() => tree.reroot(ids).map_err(ObjFunError::Tree)?,
            _ => tree,
        };
        let flat = tree.flatten_bfs();
        let (depth_min, depth_max) = tree.child_depth_range();
        info!(
            "Tree: {} leaves, {} vertices, avg branch length {:.3}, depth min {depth_min:.4e}, max {depth_max:.4e}",
            flat.n_leaves(),
            flat.n_vertices(),
            flat.mean_branch_length()
        );

        let x0 = match init {
            Some(raw) => {
                if raw.ncol() != ncol {
                    return Err(ObjFunError::ColumnMismatch { msa_ncol: ncol, raw_ncol: raw.ncol() });
                }
                packing::pack(&raw.to_params())
            }
            None => match reg.center_v() {
                Some(center) => packing::pack(&PottsParams::from_centering(ncol, center)),
                None => vec![0.0; packing::nvar(ncol)],
            },
        };

        let (data_single, data_pair) = data_counts(freqs);
        let n_leaves = flat.n_leaves();
        // Leaves share the alignment's count mass equally.
        let weights_sampled = vec![freqs.neff / n_leaves as f64; n_leaves];

        let sampler = match seed {
            Some(seed) => Sampler::with_seed(seed),
            None => Sampler::new(),
        };

        Ok(Self {
            nrow: msa.nrow(),
            ncol,
            reg,
            sampler,
            x0,
            vertices: vec![0; flat.n_vertices() * ncol],
            msa_sampled: Msa::filled(n_leaves, ncol, 0),
            weights_sampled,
            tree: flat,
            seq0,
            mutation_rate,
            data_single,
            data_pair,
            params: PottsParams::zeroed(ncol),
            grad: PottsParams::zeroed(ncol),
            reg_grad: PottsParams::zeroed(ncol),
            sample_single: vec![0.0; ncol * NUM_STATES],
            sample_pair: vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES],
        })
    }
}

impl std::fmt::Display for TreeCd {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tree-controlled contrastive divergence over {} leaves ({} alignment rows, mutation rate {}) [{}]",
            self.tree.n_leaves(),
            self.nrow,
            self.mutation_rate,
            self.reg
        )
    }
}

impl ObjectiveFunction for TreeCd {
    fn nvar(&self) -> usize {
        packing::nvar(self.ncol)
    }

    fn x0(&self) -> Vec<f64> {
        self.x0.clone()
    }

    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
        packing::unpack_into(x, &mut self.params);

        self.sampler.mutate_along_tree(
            &self.params,
            &self.tree,
            &self.seq0,
            self.mutation_rate,
            &mut self.vertices,
            &mut self.msa_sampled,
        );

        sampled_counts_gradient(
            &self.msa_sampled,
            &self.weights_sampled,
            &self.data_single,
            &self.data_pair,
            &mut self.sample_single,
            &mut self.sample_pair,
            &self.params,
            &self.reg,
            &mut self.reg_grad,
            &mut self.grad,
        );

        packing::pack_into(&self.grad, g);
        -1.0
    }

    fn finalize(&self, x: &[f64], meta: Meta) -> RawPotts {
        RawPotts::from_params(&packing::unpack(x, self.ncol), meta)
    }

    fn sampled_alignment(&self) -> Option<&Msa> {
        Some(&self.msa_sampled)
    }
}
