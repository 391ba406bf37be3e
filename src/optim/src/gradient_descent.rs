use log::info;

use objfun::ObjectiveFunction;

use crate::{norm2, norm_inf, GdOptions, MinimizeOptions, OptimReport};

/// Gradient descent with a decayed step size.
pub fn minimize(
    objective: &mut dyn ObjectiveFunction,
    mut x: Vec<f64>,
    opts: &GdOptions,
    mut common: MinimizeOptions,
) -> (f64, Vec<f64>, OptimReport) {
    let mut g = vec![0.0; objective.nvar()];
    let mut fx = f64::NAN;

    for t in 0..common.max_iters {
        if common.cancelled() {
            return (fx, x, OptimReport::new(-1, "cancelled"));
        }

        fx = objective.evaluate(&x, &mut g);
        if fx.is_nan() {
            return (fx, x, OptimReport::new(-3, format!("objective function is NaN at iteration {t}")));
        }

        let gnorm = norm2(&g);
        let gnorm_inf = norm_inf(&g);
        let xnorm = norm2(&x);
        let alpha = opts.alpha0 / (1.0 + t as f64 / opts.alpha_decay);

        info!("iter {t:>6}   fx {fx:>16.8}   |g| {gnorm:>14.6e}   |x| {xnorm:>12.4e}   step {alpha:>10.4e}");
        common.record(t, fx, gnorm, xnorm, alpha);

        if let Some(epsilon) = opts.epsilon {
            if gnorm_inf < epsilon {
                return (
                    fx,
                    x,
                    OptimReport::new(1, format!("gradient infinity norm below {epsilon} at iteration {t}")),
                );
            }
        }

        for (xi, gi) in x.iter_mut().zip(g.iter()) {
            *xi -= alpha * gi;
        }
    }

    (fx, x, OptimReport::new(0, "reached maximum number of iterations"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Quadratic;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn descends_toward_the_minimum() {
        let mut objective = Quadratic { target: vec![1.0, -2.0, 0.5] };
        let x0 = objective.x0();
        let opts = GdOptions { alpha0: 0.5, alpha_decay: 1e6, epsilon: None };
        let (fx, x, report) =
            minimize(&mut objective, x0, &opts, MinimizeOptions::with_max_iters(200));

        assert_eq!(report.code, 0);
        assert!(fx < 1e-6);
        assert!((x[0] - 1.0).abs() < 1e-3);
        assert!((x[1] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn epsilon_terminates_early() {
        let mut objective = Quadratic { target: vec![1.0; 4] };
        let x0 = objective.x0();
        let opts = GdOptions { alpha0: 0.5, alpha_decay: 1e6, epsilon: Some(1e-3) };
        let (_, _, report) =
            minimize(&mut objective, x0, &opts, MinimizeOptions::with_max_iters(10_000));

        assert_eq!(report.code, 1);
        assert!(report.finished());
    }

    #[test]
    fn cancellation_returns_a_negative_code() {
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::Relaxed);

        let mut objective = Quadratic { target: vec![1.0; 4] };
        let x0 = objective.x0();
        let common = MinimizeOptions {
            max_iters: 100,
            cancel: Some(flag),
            monitor: None,
        };
        let (_, _, report) = minimize(&mut objective, x0, &GdOptions::default(), common);
        assert_eq!(report.code, -1);
    }
}
