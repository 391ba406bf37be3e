use log::warn;

use alignment::alphabet::{NUM_AA, NUM_STATES};
use alignment::counts::{self, pair_idx, single_idx};
use alignment::{Frequencies, Msa};
use ccm_io::raw::{Meta, RawPotts};
use potts::packing::cd as packing;
use potts::{L2, PottsParams};

use crate::error::ObjFunError;
use crate::sampler::Sampler;
use crate::ObjectiveFunction;

/// Tolerated discrepancy between sampled and data count masses per column.
const COUNT_CONSERVATION_TOLERANCE: f64 = 1e-5;

/// Contrastive divergence configuration.
#[derive(Debug, Clone)]
pub struct CdOptions {
    /// Gibbs sweeps per gradient evaluation.
    pub gibbs_steps: usize,
    /// Keep the Markov chain state across evaluations (PCD).
    pub persistent: bool,
    /// Resample one position per sequence instead of full sweeps.
    pub pll_style: bool,
    /// Requested sample count; 0 keeps the input alignment size.
    pub n_samples: usize,
    /// Sampler seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for CdOptions {
    fn default() -> Self {
        Self { gibbs_steps: 1, persistent: false, pll_style: false, n_samples: 0, seed: None }
    }
}

/// The (persistent) contrastive divergence gradient estimator.
///
/// Each evaluation runs a short Gibbs chain from the working sample
/// alignment and returns `sampled counts - data counts` plus the
/// regularizer gradient. There is no tractable objective value: `evaluate`
/// returns the `-1.0` sentinel.
pub struct Cd {
    msa: Msa,
    weights: Vec<f64>,
    reg: L2,
    options: CdOptions,
    sampler: Sampler,
    x0: Vec<f64>,

    initial_sampled: Msa,
    initial_weights: Vec<f64>,
    msa_sampled: Msa,
    weights_sampled: Vec<f64>,

    data_single: Vec<f64>,
    data_pair: Vec<f64>,

    // Fixed scratch buffers.
    params: PottsParams,
    grad: PottsParams,
    reg_grad: PottsParams,
    sample_single: Vec<f64>,
    sample_pair: Vec<f64>,
}

impl Cd {
    pub fn new(
        msa: Msa,
        weights: Vec<f64>,
        freqs: &Frequencies,
        reg: L2,
        options: CdOptions,
        init: Option<&RawPotts>,
    ) -> Result<Self, ObjFunError> {
        if weights.len() != msa.nrow() {
            return Err(ObjFunError::WeightLengthMismatch { nrow: msa.nrow(), weights: weights.len() });
        }
        let ncol = msa.ncol();

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
        let (initial_sampled, initial_weights) =
            init_sample_alignment(&msa, &weights, options.n_samples);

        let sampler = match options.seed {
            Some(seed) => Sampler::with_seed(seed),
            None => Sampler::new(),
        };

        Ok(Self {
            msa_sampled: initial_sampled.clone(),
            weights_sampled: initial_weights.clone(),
            initial_sampled,
            initial_weights,
            data_single,
            data_pair,
            params: PottsParams::zeroed(ncol),
            grad: PottsParams::zeroed(ncol),
            reg_grad: PottsParams::zeroed(ncol),
            sample_single: vec![0.0; ncol * NUM_STATES],
            sample_pair: vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES],
            msa,
            weights,
            reg,
            options,
            sampler,
            x0,
        })
    }
}

impl std::fmt::Display for Cd {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}{}contrastive divergence using {} Gibbs sampling steps for sampling {} sequences [{}]",
            if self.options.persistent { "persistent " } else { "" },
            if self.options.pll_style { "single-position " } else { "" },
            self.options.gibbs_steps,
            self.msa_sampled.nrow(),
            self.reg
        )
    }
}

impl ObjectiveFunction for Cd {
    fn nvar(&self) -> usize {
        packing::nvar(self.msa.ncol())
    }

    fn x0(&self) -> Vec<f64> {
        self.x0.clone()
    }

    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
        packing::unpack_into(x, &mut self.params);

        if !self.options.persistent {
            self.msa_sampled.clone_from(&self.initial_sampled);
            self.weights_sampled.clone_from(&self.initial_weights);
        }

        if self.options.pll_style {
            self.sampler.resample_single_position(&self.params, &mut self.msa_sampled);
        } else {
            self.sampler.gibbs_sweeps(&self.params, &mut self.msa_sampled, self.options.gibbs_steps);
        }

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
        RawPotts::from_params(&packing::unpack(x, self.msa.ncol()), meta)
    }

    fn sampled_alignment(&self) -> Option<&Msa> {
        Some(&self.msa_sampled)
    }
}

/// Data count tables: `Neff * f`, gap entries zeroed.
pub(crate) fn data_counts(freqs: &Frequencies) -> (Vec<f64>, Vec<f64>) {
    let ncol = freqs.ncol;
    let mut single: Vec<f64> = freqs.single.iter().map(|f| f * freqs.neff).collect();
    let mut pair: Vec<f64> = freqs.pair.iter().map(|f| f * freqs.neff).collect();
    counts::zero_single_gaps(&mut single, ncol);
    counts::zero_pair_gaps(&mut pair, ncol);
    (single, pair)
}

/// Working sample alignment for a requested sample count.
///
/// With no request (or fewer samples than rows) the input alignment is the
/// chain state. A larger request replicates the alignment `floor(n/N)`
/// times, scaling the weights so that the total mass is conserved.
pub(crate) fn init_sample_alignment(
    msa: &Msa,
    weights: &[f64],
    n_samples: usize,
) -> (Msa, Vec<f64>) {
    if n_samples == 0 || n_samples < msa.nrow() {
        return (msa.clone(), weights.to_vec());
    }
    let factor = n_samples / msa.nrow();
    let scale = 1.0 / factor as f64;
    let tiled_weights = (0..factor)
        .flat_map(|_| weights.iter().map(|w| w * scale))
        .collect();
    (msa.tile(factor), tiled_weights)
}

/// The shared tail of every contrastive-divergence evaluation: weighted
/// counts of the sampled alignment, the count-conservation check, the raw
/// `sampled - data` gradient, the regularizer, and the gap/diagonal zeroing.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sampled_counts_gradient(
    msa_sampled: &Msa,
    weights_sampled: &[f64],
    data_single: &[f64],
    data_pair: &[f64],
    sample_single: &mut [f64],
    sample_pair: &mut [f64],
    params: &PottsParams,
    reg: &L2,
    reg_grad: &mut PottsParams,
    grad: &mut PottsParams,
) {
    let ncol = msa_sampled.ncol();

    counts::single_counts_into(msa_sampled, weights_sampled, sample_single);
    counts::pair_counts_into(msa_sampled, weights_sampled, sample_pair);
    counts::zero_single_gaps(sample_single, ncol);
    counts::zero_pair_gaps(sample_pair, ncol);

    check_count_conservation(sample_single, data_single, ncol);

    // Raw gradient: sampled counts minus data counts.
    for i in 0..ncol {
        for a in 0..NUM_AA {
            let idx = single_idx(i, a);
            grad.v[i * NUM_AA + a] = sample_single[idx] - data_single[idx];
        }
    }
    for ((g, &sampled), &data) in grad.w.iter_mut().zip(sample_pair.iter()).zip(data_pair.iter()) {
        *g = sampled - data;
    }

    // Regularizer, then the zeroing conventions on top of it.
    reg.apply_into(params, reg_grad);
    for (g, &r) in grad.v.iter_mut().zip(reg_grad.v.iter()) {
        *g += r;
    }
    for (g, &r) in grad.w.iter_mut().zip(reg_grad.w.iter()) {
        *g += r;
    }

    let gap = NUM_STATES - 1;
    for i in 0..ncol {
        for a in 0..NUM_STATES {
            for b in 0..NUM_STATES {
                grad.w[pair_idx(ncol, i, i, a, b)] = 0.0;
            }
        }
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                grad.w[pair_idx(ncol, i, j, a, gap)] = 0.0;
                grad.w[pair_idx(ncol, i, j, gap, a)] = 0.0;
            }
        }
    }
}

/// The sampled alignment must carry the same count mass as the data in
/// every column; a violation indicates broken sample weighting.
fn check_count_conservation(sample_single: &[f64], data_single: &[f64], ncol: usize) {
    let mut worst = 0.0_f64;
    let mut worst_col = 0;
    for i in 0..ncol {
        let sampled: f64 = (0..NUM_STATES).map(|a| sample_single[single_idx(i, a)]).sum();
        let data: f64 = (0..NUM_STATES).map(|a| data_single[single_idx(i, a)]).sum();
        let discrepancy = (sampled - data).abs();
        if discrepancy > worst {
            worst = discrepancy;
            worst_col = i;
        }
    }
    if worst > COUNT_CONSERVATION_TOLERANCE {
        warn!(
            "sampled amino acid counts do not match the input alignment counts \
             (column {worst_col}: discrepancy {worst:.3e})"
        );
    }
}
