use alignment::alphabet::{NUM_AA, NUM_STATES};
use alignment::counts::pair_idx;

use crate::params::PottsParams;

/// Padded width of the third pair axis (21 states padded to 32).
pub const PADDED_STATES: usize = 32;

/// Size of the unpadded single block.
#[inline]
#[must_use]
pub fn nsingle(ncol: usize) -> usize {
    ncol * NUM_AA
}

/// The single block is padded up to the next multiple of 32 so that the
/// pair block starts on an aligned boundary. An exact multiple still gains
/// a full padding stride.
#[inline]
#[must_use]
pub fn nsingle_padded(ncol: usize) -> usize {
    let ns = nsingle(ncol);
    ns + PADDED_STATES - (ns % PADDED_STATES)
}

/// Total length of the flat vector.
#[inline]
#[must_use]
pub fn nvar(ncol: usize) -> usize {
    nsingle_padded(ncol) + ncol * ncol * NUM_STATES * PADDED_STATES
}

/// Flat offset of `v[i,a]`; single-block memory order is `v[a,i]`.
#[inline]
#[must_use]
pub fn v_offset(ncol: usize, i: usize, a: usize) -> usize {
    a * ncol + i
}

/// Flat offset of `w[i,j,a,b]`; pair-block memory order is `w[b,j,a,i]`
/// with the `a` axis padded to 32 entries.
#[inline]
#[must_use]
pub fn w_offset(ncol: usize, i: usize, j: usize, a: usize, b: usize) -> usize {
    nsingle_padded(ncol) + ((b * ncol + j) * PADDED_STATES + a) * ncol + i
}

/// Pack structured parameters into a flat vector. Padding entries are zero.
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

    x.iter_mut().for_each(|v| *v = 0.0);
    for i in 0..ncol {
        for a in 0..NUM_AA {
            x[v_offset(ncol, i, a)] = params.v(i, a);
        }
    }
    for i in 0..ncol {
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    x[w_offset(ncol, i, j, a, b)] = params.w[pair_idx(ncol, i, j, a, b)];
                }
            }
        }
    }
}

/// Unpack a flat vector into structured parameters, clipping the padding.
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

    for i in 0..ncol {
        for a in 0..NUM_AA {
            params.set_v(i, a, x[v_offset(ncol, i, a)]);
        }
    }
    for i in 0..ncol {
        for j in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    params.w[pair_idx(ncol, i, j, a, b)] = x[w_offset(ncol, i, j, a, b)];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_params(ncol: usize, seed: u64) -> PottsParams {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut params = PottsParams::zeroed(ncol);
        params.v.iter_mut().for_each(|x| *x = rng.f64() - 0.5);
        params.w.iter_mut().for_each(|x| *x = rng.f64() - 0.5);
        params
    }

    #[test]
    fn roundtrip_is_identity() {
        for ncol in [3, 5, 8] {
            let params = random_params(ncol, 123);
            assert_eq!(unpack(&pack(&params), ncol), params);
        }
    }

    #[test]
    fn padding_always_shifts_the_pair_block() {
        // ncol = 8 -> nsingle = 160, an exact multiple of 32: the pad still
        // inserts a full stride.
        assert_eq!(nsingle_padded(8), 160 + 32);
        assert_eq!(nsingle_padded(3), 64);
    }

    #[test]
    fn padding_entries_stay_zero() {
        let params = random_params(4, 9);
        let x = pack(&params);
        let ncol = 4;
        for i in 0..ncol {
            for j in 0..ncol {
                for a in NUM_STATES..PADDED_STATES {
                    for b in 0..NUM_STATES {
                        assert_eq!(x[w_offset(ncol, i, j, a, b)], 0.0);
                    }
                }
            }
        }
        for pad in nsingle(ncol)..nsingle_padded(ncol) {
            assert_eq!(x[pad], 0.0);
        }
    }

    #[test]
    fn layouts_disagree_on_memory_but_agree_on_values() {
        use crate::packing::cd;
        let params = random_params(5, 77);
        let x_pll = pack(&params);
        let x_cd = cd::pack(&params);
        assert_ne!(x_pll.len(), x_cd.len());
        assert_eq!(unpack(&x_pll, 5), cd::unpack(&x_cd, 5));
    }
}
