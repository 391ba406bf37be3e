use alignment::alphabet::{NUM_AA, NUM_STATES};
use alignment::counts::pair_idx;

use crate::params::PottsParams;

/// Size of the single block.
#[inline]
#[must_use]
pub fn nsingle(ncol: usize) -> usize {
    ncol * NUM_AA
}

/// Total length of the flat vector.
#[inline]
#[must_use]
pub fn nvar(ncol: usize) -> usize {
    nsingle(ncol) + ncol * ncol * NUM_STATES * NUM_STATES
}

/// Flat offset of `v[i,a]`.
#[inline]
#[must_use]
pub fn v_offset(i: usize, a: usize) -> usize {
    i * NUM_AA + a
}

/// Flat offset of `w[i,j,a,b]`; pair-block memory order is `w[i,a,j,b]`.
#[inline]
#[must_use]
pub fn w_offset(ncol: usize, i: usize, j: usize, a: usize, b: usize) -> usize {
    nsingle(ncol) + ((i * NUM_STATES + a) * ncol + j) * NUM_STATES + b
}

/// Pack structured parameters into a flat vector.
#[must_use]
pub fn pack(params: &PottsParams) -> Vec<f64> {
    let mut x = vec![0.0; nvar(params.ncol())];
    pack_into(params, &mut x);
    x
}

/// Pack into a preallocated flat vector (overwrites every entry).
pub fn pack_into(params: &PottsParams, x: &mut [f64]) {
    let ncol = params.ncol();
    debug_assert_eq!(x.len(), nvar(ncol));

    x[..nsingle(ncol)].copy_from_slice(&params.v);
    for i in 0..ncol {
        for a in 0..NUM_STATES {
            for j in 0..ncol {
                for b in 0..NUM_STATES {
                    x[w_offset(ncol, i, j, a, b)] = params.w[pair_idx(ncol, i, j, a, b)];
                }
            }
        }
    }
}

/// Unpack a flat vector into structured parameters.
#[must_use]
pub fn unpack(x: &[f64], ncol: usize) -> PottsParams {
    let mut params = PottsParams::zeroed(ncol);
    unpack_into(x, &mut params);
    params
}

/// Unpack into a preallocated parameter buffer (overwrites every entry).
pub fn unpack_into(x: &[f64], params: &mut PottsParams) {
    let ncol = params.ncol();
    debug_assert_eq!(x.len(), nvar(ncol));

    params.v.copy_from_slice(&x[..nsingle(ncol)]);
    for i in 0..ncol {
        for a in 0..NUM_STATES {
            for j in 0..ncol {
                for b in 0..NUM_STATES {
                    params.w[pair_idx(ncol, i, j, a, b)] = x[w_offset(ncol, i, j, a, b)];
                }
            }
        }
    }
}
