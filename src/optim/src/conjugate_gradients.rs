use log::{debug, info};

use objfun::ObjectiveFunction;

use crate::{dot, norm2, CgOptions, MinimizeOptions, OptimReport};

/// Nonlinear conjugate gradients: Polak-Ribiere+ directions (restart on a
/// negative beta or a non-descent direction) with a strong-Wolfe line
/// search. A NaN objective value is treated as a line-search failure.
pub fn minimize(
    objective: &mut dyn ObjectiveFunction,
    mut x: Vec<f64>,
    opts: &CgOptions,
    mut common: MinimizeOptions,
) -> (f64, Vec<f64>, OptimReport) {
    let n = objective.nvar();
    let mut g = vec![0.0; n];
    let mut fx = objective.evaluate(&x, &mut g);
    if fx.is_nan() {
        return (fx, x, OptimReport::new(-3, "objective function is NaN at the starting point"));
    }

    let mut d: Vec<f64> = g.iter().map(|gi| -gi).collect();
    let mut g_prev = vec![0.0; n];
    let mut x_trial = vec![0.0; n];
    let mut g_trial = vec![0.0; n];
    let mut last_alpha = 0.0;

    for k in 0..common.max_iters {
        if common.cancelled() {
            return (fx, x, OptimReport::new(-1, "cancelled"));
        }

        let gg = dot(&g, &g);
        let gnorm = gg.sqrt();
        let xnorm = norm2(&x);

        info!("iter {k:>6}   fx {fx:>16.8}   |g| {gnorm:>14.6e}   |x| {xnorm:>12.4e}   step {last_alpha:>10.4e}");
        common.record(k, fx, gnorm, xnorm, last_alpha);

        if gnorm < opts.epsilon {
            return (
                fx,
                x,
                OptimReport::new(1, format!("gradient norm below {} at iteration {k}", opts.epsilon)),
            );
        }

        let mut dg0 = dot(&d, &g);
        if dg0 >= 0.0 {
            // Not a descent direction: restart along the steepest descent.
            debug!("iteration {k}: restarting along -g (d'g = {dg0:.3e})");
            for (di, &gi) in d.iter_mut().zip(g.iter()) {
                *di = -gi;
            }
            dg0 = -gg;
        }

        let alpha_init = if k == 0 { (1.0 / gnorm).min(1.0) } else { 1.0 };
        let Some((alpha, fx_new)) = line_search(
            objective, &x, &d, fx, dg0, alpha_init, opts, &mut x_trial, &mut g_trial,
        ) else {
            return (fx, x, OptimReport::new(-2, format!("line search failed at iteration {k}")));
        };

        last_alpha = alpha;
        fx = fx_new;
        g_prev.copy_from_slice(&g);
        x.copy_from_slice(&x_trial);
        g.copy_from_slice(&g_trial);

        // Polak-Ribiere+, clipped at zero.
        let beta = ((dot(&g, &g) - dot(&g, &g_prev)) / gg).max(0.0);
        for (di, &gi) in d.iter_mut().zip(g.iter()) {
            *di = -gi + beta * *di;
        }
    }

    (fx, x, OptimReport::new(0, "reached maximum number of iterations"))
}

/// Evaluate `phi(alpha) = f(x + alpha d)`; fills the trial buffers.
#[allow(clippy::too_many_arguments)]
fn eval_step(
    objective: &mut dyn ObjectiveFunction,
    x: &[f64],
    d: &[f64],
    alpha: f64,
    x_trial: &mut [f64],
    g_trial: &mut [f64],
) -> (f64, f64) {
    for ((xt, &xi), &di) in x_trial.iter_mut().zip(x.iter()).zip(d.iter()) {
        *xt = xi + alpha * di;
    }
    let phi = objective.evaluate(x_trial, g_trial);
    let dphi = dot(g_trial, d);
    (phi, dphi)
}

/// Bracketing phase of the strong-Wolfe search. On success the trial
/// buffers hold the accepted point and its gradient.
#[allow(clippy::too_many_arguments)]
fn line_search(
    objective: &mut dyn ObjectiveFunction,
    x: &[f64],
    d: &[f64],
    phi0: f64,
    dphi0: f64,
    alpha_init: f64,
    opts: &CgOptions,
    x_trial: &mut [f64],
    g_trial: &mut [f64],
) -> Option<(f64, f64)> {
    let mut alpha_prev = 0.0;
    let mut phi_prev = phi0;
    let mut alpha = alpha_init;

    for iter in 0..opts.max_linesearch {
        let (phi, dphi) = eval_step(objective, x, d, alpha, x_trial, g_trial);
        if phi.is_nan() {
            return None;
        }

        if phi > phi0 + opts.wolfe_c1 * alpha * dphi0 || (iter > 0 && phi >= phi_prev) {
            return zoom(objective, x, d, phi0, dphi0, alpha_prev, phi_prev, alpha, opts, x_trial, g_trial);
        }
        if dphi.abs() <= -opts.wolfe_c2 * dphi0 {
            return Some((alpha, phi));
        }
        if dphi >= 0.0 {
            return zoom(objective, x, d, phi0, dphi0, alpha, phi, alpha_prev, opts, x_trial, g_trial);
        }

        alpha_prev = alpha;
        phi_prev = phi;
        alpha *= 2.0;
    }
    None
}

/// Sectioning phase: bisect `[lo, hi]` until the strong Wolfe conditions
/// hold.
#[allow(clippy::too_many_arguments)]
fn zoom(
    objective: &mut dyn ObjectiveFunction,
    x: &[f64],
    d: &[f64],
    phi0: f64,
    dphi0: f64,
    mut lo: f64,
    mut phi_lo: f64,
    mut hi: f64,
    opts: &CgOptions,
    x_trial: &mut [f64],
    g_trial: &mut [f64],
) -> Option<(f64, f64)> {
    for _ in 0..opts.max_linesearch {
        let alpha = 0.5 * (lo + hi);
        if (hi - lo).abs() < f64::EPSILON * alpha.abs().max(1.0) {
            return None;
        }

        let (phi, dphi) = eval_step(objective, x, d, alpha, x_trial, g_trial);
        if phi.is_nan() {
            return None;
        }

        if phi > phi0 + opts.wolfe_c1 * alpha * dphi0 || phi >= phi_lo {
            hi = alpha;
        } else {
            if dphi.abs() <= -opts.wolfe_c2 * dphi0 {
                return Some((alpha, phi));
            }
            if dphi * (hi - lo) >= 0.0 {
                hi = lo;
            }
            lo = alpha;
            phi_lo = phi;
        }
    }
    None
}
