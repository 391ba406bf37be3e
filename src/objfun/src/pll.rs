use rayon::prelude::*;

use alignment::alphabet::{NUM_AA, NUM_STATES};
use alignment::counts::pair_idx;
use alignment::Msa;
use ccm_io::raw::{Meta, RawPotts};
use potts::packing::pll as packing;
use potts::{L2, PottsParams};

use crate::error::ObjFunError;
use crate::sampler;
use crate::ObjectiveFunction;

/// The pseudo-likelihood objective.
///
/// `fx = sum_s sum_i -w_s log P(msa[s,i] | rest of row s)`, with the
/// conditional given by the softmax of `z_a = v[i,a] + sum_{j!=i}
/// w[i,j,a,msa[s,j]]` over the twenty amino-acid states. Gapped target
/// positions contribute nothing; gaps in the context condition the logits
/// through the pair potentials' gap column.
///
/// The pair block is read through its symmetrized view
/// `(w[i,j,a,b] + w[j,i,b,a]) / 2`, which makes the reported pair gradient
/// the exact partial derivative of `fx` at every non-gap coordinate while
/// keeping it symmetric.
pub struct Pll {
    msa: Msa,
    weights: Vec<f64>,
    reg: L2,
    x0: Vec<f64>,
    // Fixed scratch buffers: nothing below is allocated during evaluation.
    params: PottsParams,
    data_grad: PottsParams,
    grad: PottsParams,
    reg_grad: PottsParams,
    fx_cols: Vec<f64>,
}

impl Pll {
    pub fn new(
        msa: Msa,
        weights: Vec<f64>,
        reg: L2,
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

        Ok(Self {
            params: PottsParams::zeroed(ncol),
            data_grad: PottsParams::zeroed(ncol),
            grad: PottsParams::zeroed(ncol),
            reg_grad: PottsParams::zeroed(ncol),
            fx_cols: vec![0.0; ncol],
            msa,
            weights,
            reg,
            x0,
        })
    }

    /// Average the two storage slots of every coupling in place.
    fn symmetrize_params(&mut self) {
        let ncol = self.params.ncol();
        for i in 0..ncol {
            for j in (i + 1)..ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let upper = pair_idx(ncol, i, j, a, b);
                        let lower = pair_idx(ncol, j, i, b, a);
                        let mean = 0.5 * (self.params.w[upper] + self.params.w[lower]);
                        self.params.w[upper] = mean;
                        self.params.w[lower] = mean;
                    }
                }
            }
        }
    }

    /// Per-column conditional accumulation, parallel over columns.
    ///
    /// Column `i` owns the disjoint slices `data_grad.v[i, ..]` and
    /// `data_grad.w[i, .., .., ..]` plus its own `fx` cell, and folds the
    /// alignment rows in order, so the result does not depend on the thread
    /// count.
    fn accumulate_conditionals(&mut self) {
        let ncol = self.msa.ncol();
        let w_block = ncol * NUM_STATES * NUM_STATES;

        let params = &self.params;
        let msa = &self.msa;
        let weights = &self.weights;

        self.data_grad.w.par_chunks_exact_mut(w_block)
            .zip(self.data_grad.v.par_chunks_exact_mut(NUM_AA))
            .zip(self.fx_cols.par_iter_mut())
            .enumerate()
            .for_each(|(i, ((w_slice, v_slice), fx_col))| {
                w_slice.iter_mut().for_each(|g| *g = 0.0);
                v_slice.iter_mut().for_each(|g| *g = 0.0);
                *fx_col = 0.0;

                let mut logits = [0.0; NUM_AA];
                let mut probs = [0.0; NUM_AA];

                for (row, &ws) in msa.rows().zip(weights.iter()) {
                    let observed = row[i] as usize;
                    if observed == NUM_AA {
                        // Gapped target position.
                        continue;
                    }
                    sampler::fill_aa_logits(params, row, i, &mut logits);

                    let zmax = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let mut total = 0.0;
                    for (p, &z) in probs.iter_mut().zip(logits.iter()) {
                        *p = (z - zmax).exp();
                        total += *p;
                    }
                    let inv_total = 1.0 / total;
                    probs.iter_mut().for_each(|p| *p *= inv_total);

                    *fx_col -= ws * (logits[observed] - zmax - total.ln());

                    for (a, g) in v_slice.iter_mut().enumerate() {
                        let indicator = f64::from(u8::from(a == observed));
                        *g += ws * (probs[a] - indicator);
                    }
                    for (j, &bj) in row.iter().enumerate() {
                        if j == i {
                            continue;
                        }
                        let b = bj as usize;
                        for (a, &p) in probs.iter().enumerate() {
                            let indicator = f64::from(u8::from(a == observed));
                            w_slice[(j * NUM_STATES + a) * NUM_STATES + b] += ws * (p - indicator);
                        }
                    }
                }
            });
    }

    /// Combine data and regularizer gradients into `self.grad`:
    /// pair slots get the symmetrized half-sum, the diagonal and the gap
    /// rows/columns are zeroed.
    fn combine_gradients(&mut self) {
        let ncol = self.msa.ncol();
        let gap = NUM_STATES - 1;

        for ((g, &data), &reg) in self.grad.v.iter_mut()
            .zip(self.data_grad.v.iter())
            .zip(self.reg_grad.v.iter())
        {
            *g = data + reg;
        }

        for i in 0..ncol {
            for j in 0..ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let idx = pair_idx(ncol, i, j, a, b);
                        self.grad.w[idx] = if i == j || a == gap || b == gap {
                            0.0
                        } else {
                            let mirrored = self.data_grad.w[pair_idx(ncol, j, i, b, a)];
                            0.5 * (self.data_grad.w[idx] + mirrored) + self.reg_grad.w[idx]
                        };
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Pll {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "pseudo-likelihood over {} sequences and {} columns [{}]",
            self.msa.nrow(),
            self.msa.ncol(),
            self.reg
        )
    }
}

impl ObjectiveFunction for Pll {
    fn nvar(&self) -> usize {
        packing::nvar(self.msa.ncol())
    }

    fn x0(&self) -> Vec<f64> {
        self.x0.clone()
    }

    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
        packing::unpack_into(x, &mut self.params);

        // The penalty applies to the raw storage slots; the conditionals
        // read the symmetrized view.
        let penalty = self.reg.apply_into(&self.params, &mut self.reg_grad);
        self.symmetrize_params();

        self.accumulate_conditionals();
        let fx: f64 = self.fx_cols.iter().sum();

        self.combine_gradients();
        packing::pack_into(&self.grad, g);
        fx + penalty
    }

    fn finalize(&self, x: &[f64], meta: Meta) -> RawPotts {
        RawPotts::from_params(&packing::unpack(x, self.msa.ncol()), meta)
    }
}
