pub mod alphabet;
pub mod msa;
pub mod weighting;
pub mod counts;
pub mod pseudocounts;
pub mod centering;

pub use alphabet::{GAP, NUM_AA, NUM_STATES};
pub use msa::Msa;
pub use pseudocounts::{Frequencies, PseudocountMode};
