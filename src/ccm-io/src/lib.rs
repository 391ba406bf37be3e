pub mod raw;
pub mod matrix;
pub mod msa;
pub mod writer;

pub use raw::RawPotts;
pub use writer::GenericWriter;
