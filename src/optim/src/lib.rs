//! First-order optimizers over [`objfun::ObjectiveFunction`] values.
//!
//! All optimizers share one entry point, [`minimize`], and report their
//! outcome through [`OptimReport`]: `code > 0` is a successful
//! convergence, `0` means the iteration budget ran out, and negative codes
//! are diagnostics (cancellation, line-search failure, NaN objective).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use objfun::ObjectiveFunction;

pub mod gradient_descent;
pub mod conjugate_gradients;
pub mod numdiff;
pub mod monitor;

pub use monitor::Monitor;

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimReport {
    pub code: i32,
    pub message: String,
}

impl OptimReport {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// True when the optimizer finished normally.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.code >= 0
    }
}

impl std::fmt::Display for OptimReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "code {} -- {}", self.code, self.message)
    }
}

/// Gradient descent configuration. The step decays as
/// `alpha0 / (1 + t / alpha_decay)`.
#[derive(Debug, Clone)]
pub struct GdOptions {
    pub alpha0: f64,
    pub alpha_decay: f64,
    /// Optional termination threshold on the infinity norm of the gradient.
    pub epsilon: Option<f64>,
}

impl Default for GdOptions {
    fn default() -> Self {
        Self { alpha0: 5e-3, alpha_decay: 10.0, epsilon: None }
    }
}

/// Conjugate gradient configuration (Polak-Ribiere+ with a strong-Wolfe
/// line search).
#[derive(Debug, Clone)]
pub struct CgOptions {
    /// Termination threshold on the Euclidean gradient norm.
    pub epsilon: f64,
    pub max_linesearch: usize,
    pub wolfe_c1: f64,
    pub wolfe_c2: f64,
}

impl Default for CgOptions {
    fn default() -> Self {
        Self { epsilon: 1e-7, max_linesearch: 30, wolfe_c1: 1e-4, wolfe_c2: 0.1 }
    }
}

/// Numerical differentiation configuration (a gradient cross-check, not an
/// optimizer proper).
#[derive(Debug, Clone)]
pub struct NumDiffOptions {
    /// How many coordinates to probe (evenly strided).
    pub n_coordinates: usize,
    /// Central difference step.
    pub step: f64,
}

impl Default for NumDiffOptions {
    fn default() -> Self {
        Self { n_coordinates: 30, step: 1e-4 }
    }
}

/// Algorithm selector.
#[derive(Debug, Clone)]
pub enum Algorithm {
    GradientDescent(GdOptions),
    ConjugateGradients(CgOptions),
    NumericalDifferentiation(NumDiffOptions),
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::GradientDescent(opts) => {
                write!(f, "gradient descent (alpha0={}, decay={})", opts.alpha0, opts.alpha_decay)
            }
            Self::ConjugateGradients(opts) => {
                write!(f, "conjugate gradients (epsilon={})", opts.epsilon)
            }
            Self::NumericalDifferentiation(opts) => {
                write!(f, "numerical differentiation (step={})", opts.step)
            }
        }
    }
}

/// Options shared by every algorithm.
#[derive(Default)]
pub struct MinimizeOptions {
    pub max_iters: usize,
    /// Cooperative cancellation, polled between outer iterations.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Optional per-iteration trajectory recorder.
    pub monitor: Option<Monitor>,
}

impl MinimizeOptions {
    #[must_use]
    pub fn with_max_iters(max_iters: usize) -> Self {
        Self { max_iters, ..Self::default() }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub(crate) fn record(&mut self, iter: usize, fx: f64, gnorm: f64, xnorm: f64, step: f64) {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.record(iter, fx, gnorm, xnorm, step);
        }
    }
}

/// Single optimizer entry point.
pub fn minimize(
    objective: &mut dyn ObjectiveFunction,
    x0: Vec<f64>,
    algorithm: &Algorithm,
    options: MinimizeOptions,
) -> (f64, Vec<f64>, OptimReport) {
    match algorithm {
        Algorithm::GradientDescent(opts) => gradient_descent::minimize(objective, x0, opts, options),
        Algorithm::ConjugateGradients(opts) => {
            conjugate_gradients::minimize(objective, x0, opts, options)
        }
        Algorithm::NumericalDifferentiation(opts) => numdiff::numdiff(objective, x0, opts),
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm2(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |acc, &x| acc.max(x.abs()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use ccm_io::raw::RawPotts;

    /// A convex quadratic `sum 0.5 * (x_i - target_i)^2` standing in for a
    /// real objective in optimizer unit tests.
    pub struct Quadratic {
        pub target: Vec<f64>,
    }

    impl std::fmt::Display for Quadratic {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "quadratic test objective ({} variables)", self.target.len())
        }
    }

    impl ObjectiveFunction for Quadratic {
        fn nvar(&self) -> usize {
            self.target.len()
        }

        fn x0(&self) -> Vec<f64> {
            vec![0.0; self.target.len()]
        }

        fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
            let mut fx = 0.0;
            for ((gi, &xi), &ti) in g.iter_mut().zip(x.iter()).zip(self.target.iter()) {
                let delta = xi - ti;
                fx += 0.5 * delta * delta;
                *gi = delta;
            }
            fx
        }

        fn finalize(&self, _x: &[f64], meta: serde_json::Map<String, serde_json::Value>) -> RawPotts {
            RawPotts::new(
                1,
                vec![0.0; 21],
                vec![0.0; 21 * 21],
                meta,
            )
        }
    }
}
