use log::info;

use objfun::ObjectiveFunction;

use crate::{NumDiffOptions, OptimReport};

/// Central-difference gradient cross-check.
///
/// Probes an evenly strided sample of coordinates, comparing
/// `(f(x+he) - f(x-he)) / 2h` against the analytic gradient. This is a
/// debugging aid, not an optimizer: `x` is returned unchanged.
pub fn numdiff(
    objective: &mut dyn ObjectiveFunction,
    x0: Vec<f64>,
    opts: &NumDiffOptions,
) -> (f64, Vec<f64>, OptimReport) {
    let n = objective.nvar();
    let mut g = vec![0.0; n];
    let mut scratch = vec![0.0; n];

    let fx = objective.evaluate(&x0, &mut g);
    info!("numerical differentiation at fx = {fx:.8}, probing {} of {n} coordinates", opts.n_coordinates.min(n));

    let mut x = x0.clone();
    let stride = (n / opts.n_coordinates.max(1)).max(1);
    let h = opts.step;

    let mut worst_absolute = 0.0_f64;
    let mut worst_relative = 0.0_f64;

    for idx in (0..n).step_by(stride) {
        let original = x[idx];
        x[idx] = original + h;
        let fx_plus = objective.evaluate(&x, &mut scratch);
        x[idx] = original - h;
        let fx_minus = objective.evaluate(&x, &mut scratch);
        x[idx] = original;

        let numeric = (fx_plus - fx_minus) / (2.0 * h);
        let absolute = (numeric - g[idx]).abs();
        let relative = absolute / numeric.abs().max(g[idx].abs()).max(1e-10);

        info!(
            "coordinate {idx:>9}: analytic {:>+15.8e}   numeric {numeric:>+15.8e}   absolute {absolute:>10.3e}   relative {relative:>10.3e}",
            g[idx]
        );
        worst_absolute = worst_absolute.max(absolute);
        worst_relative = worst_relative.max(relative);
    }

    let message = format!(
        "numerical differentiation finished (worst absolute {worst_absolute:.3e}, worst relative {worst_relative:.3e})"
    );
    (fx, x0, OptimReport::new(1, message))
}
