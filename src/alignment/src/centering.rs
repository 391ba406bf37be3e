use crate::alphabet::NUM_AA;
use crate::counts::single_idx;
use crate::pseudocounts::Frequencies;

/// Frequencies are floored before taking logarithms; only reachable when
/// pseudocounts are disabled.
const LOG_FLOOR: f64 = 1e-10;

/// Derive the default centering vector `c_v[L][20]` from pseudocounted
/// single-site frequencies.
///
/// For every column the amino-acid frequencies are renormalized over the 20
/// non-gap states, and the centering entry is the log frequency shifted to
/// zero mean: `c_v[i,a] = ln f~[i,a] - mean_b ln f~[i,b]`. Zero-mean columns
/// keep the single potentials identifiable under the 21st-state-is-zero
/// convention.
#[must_use]
pub fn calculate(freqs: &Frequencies) -> Vec<f64> {
    let ncol = freqs.ncol;
    let mut center = vec![0.0; ncol * NUM_AA];

    for i in 0..ncol {
        let aa_mass: f64 = (0..NUM_AA).map(|a| freqs.single[single_idx(i, a)]).sum();
        let log_freqs: Vec<f64> = (0..NUM_AA)
            .map(|a| (freqs.single[single_idx(i, a)] / aa_mass).max(LOG_FLOOR).ln())
            .collect();
        let mean = log_freqs.iter().sum::<f64>() / NUM_AA as f64;

        for a in 0..NUM_AA {
            center[i * NUM_AA + a] = log_freqs[a] - mean;
        }
    }
    center
}
