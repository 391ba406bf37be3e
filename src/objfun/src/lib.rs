//! Approximate objectives for Potts model inference.
//!
//! Every objective exposes the same contract to the optimizers: a flat
//! parameter vector in, the objective value and its flat gradient out. The
//! flat layout is objective-specific (see [`potts::packing`]); the
//! optimizers never look inside it.

use alignment::Msa;
use ccm_io::raw::RawPotts;

pub mod error;
pub mod sampler;
pub mod tree;
pub mod pll;
pub mod cd;
pub mod treecd;

pub use error::ObjFunError;
pub use sampler::Sampler;
pub use pll::Pll;
pub use cd::{Cd, CdOptions};
pub use treecd::TreeCd;

/// A differentiable (or gradient-estimating) training objective.
///
/// Objectives own their scratch state: the persistent sample alignment of
/// contrastive divergence lives behind `&mut self`, so optimizers must not
/// clone the objective or assume statelessness.
pub trait ObjectiveFunction: std::fmt::Display {
    /// Length of the flat parameter vector.
    fn nvar(&self) -> usize;

    /// Starting point: packed centering potentials, or the packed contents
    /// of an initialization raw file.
    fn x0(&self) -> Vec<f64>;

    /// Evaluate the objective at `x`, writing the gradient into `g`
    /// (overwritten, `g.len() == nvar()`).
    ///
    /// Contrastive divergence has no tractable objective value and returns
    /// the `-1.0` sentinel; optimizers tolerate it.
    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64;

    /// Unpack a solution into raw potentials, attaching run metadata.
    fn finalize(&self, x: &[f64], meta: serde_json::Map<String, serde_json::Value>) -> RawPotts;

    /// The working sample alignment, for objectives that keep one.
    fn sampled_alignment(&self) -> Option<&Msa> {
        None
    }
}
