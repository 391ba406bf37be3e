use alignment::alphabet::{NUM_AA, NUM_STATES};
use alignment::counts::pair_idx;

/// Structured Potts model parameters.
///
/// - single potentials `v[L][20]`: the 21st (gap) state is fixed to zero by
///   construction and never materialized here;
/// - pair potentials `w[L][L][21][21]` in full symmetric storage:
///   `w[i,j,a,b] = w[j,i,b,a]`, diagonal blocks zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PottsParams {
    ncol: usize,
    /// `L x 20`, flat, row-major.
    pub v: Vec<f64>,
    /// `L x L x 21 x 21`, flat (see [`alignment::counts::pair_idx`]).
    pub w: Vec<f64>,
}

impl PottsParams {
    #[must_use]
    pub fn zeroed(ncol: usize) -> Self {
        Self {
            ncol,
            v: vec![0.0; ncol * NUM_AA],
            w: vec![0.0; ncol * ncol * NUM_STATES * NUM_STATES],
        }
    }

    /// Start from a centering vector: `v = c_v`, `w = 0`.
    #[must_use]
    pub fn from_centering(ncol: usize, center_v: &[f64]) -> Self {
        let mut params = Self::zeroed(ncol);
        params.v.copy_from_slice(center_v);
        params
    }

    #[must_use] pub fn ncol(&self) -> usize { self.ncol }

    #[inline]
    #[must_use]
    pub fn v(&self, i: usize, a: usize) -> f64 {
        self.v[i * NUM_AA + a]
    }

    #[inline]
    pub fn set_v(&mut self, i: usize, a: usize, value: f64) {
        self.v[i * NUM_AA + a] = value;
    }

    #[inline]
    #[must_use]
    pub fn w(&self, i: usize, j: usize, a: usize, b: usize) -> f64 {
        self.w[pair_idx(self.ncol, i, j, a, b)]
    }

    #[inline]
    pub fn set_w(&mut self, i: usize, j: usize, a: usize, b: usize, value: f64) {
        self.w[pair_idx(self.ncol, i, j, a, b)] = value;
    }

    /// Single potentials padded with an explicit zero gap column (`L x 21`).
    #[must_use]
    pub fn v_with_gap(&self) -> Vec<f64> {
        let mut padded = vec![0.0; self.ncol * NUM_STATES];
        for i in 0..self.ncol {
            padded[i * NUM_STATES..i * NUM_STATES + NUM_AA]
                .copy_from_slice(&self.v[i * NUM_AA..(i + 1) * NUM_AA]);
        }
        padded
    }

    /// Strip the gap column of an `L x 21` single table.
    #[must_use]
    pub fn v_from_padded(ncol: usize, padded: &[f64]) -> Vec<f64> {
        let mut v = vec![0.0; ncol * NUM_AA];
        for i in 0..ncol {
            v[i * NUM_AA..(i + 1) * NUM_AA]
                .copy_from_slice(&padded[i * NUM_STATES..i * NUM_STATES + NUM_AA]);
        }
        v
    }

    /// Reset every entry to zero, keeping the allocation.
    pub fn clear(&mut self) {
        self.v.iter_mut().for_each(|x| *x = 0.0);
        self.w.iter_mut().for_each(|x| *x = 0.0);
    }

    /// Enforce `w[j,i,b,a] = w[i,j,a,b]` from the upper triangle and zero the
    /// diagonal blocks. Readers of external parameter files use this to
    /// repair half-filled tensors.
    pub fn symmetrize_from_upper(&mut self) {
        let ncol = self.ncol;
        for i in 0..ncol {
            for a in 0..NUM_STATES {
                for b in 0..NUM_STATES {
                    self.w[pair_idx(ncol, i, i, a, b)] = 0.0;
                }
            }
            for j in (i + 1)..ncol {
                for a in 0..NUM_STATES {
                    for b in 0..NUM_STATES {
                        let value = self.w[pair_idx(ncol, i, j, a, b)];
                        self.w[pair_idx(ncol, j, i, b, a)] = value;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn gap_padding_roundtrip() {
        let mut params = PottsParams::zeroed(3);
        params.set_v(1, 4, 2.5);
        let padded = params.v_with_gap();
        assert_approx_eq!(f64, padded[NUM_STATES + 4], 2.5);
        assert_approx_eq!(f64, padded[NUM_STATES + NUM_AA], 0.0); // gap entry
        assert_eq!(PottsParams::v_from_padded(3, &padded), params.v);
    }

    #[test]
    fn symmetrize_mirrors_upper_triangle() {
        let mut params = PottsParams::zeroed(2);
        params.set_w(0, 1, 3, 7, 1.25);
        params.set_w(0, 0, 1, 1, 9.0); // diagonal garbage
        params.symmetrize_from_upper();
        assert_approx_eq!(f64, params.w(1, 0, 7, 3), 1.25);
        assert_approx_eq!(f64, params.w(0, 0, 1, 1), 0.0);
    }
}
