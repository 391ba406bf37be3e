use thiserror::Error;

use crate::tree::TreeError;

#[derive(Error, Debug)]
pub enum ObjFunError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Mismatching number of columns: MSA {msa_ncol}, raw {raw_ncol}")]
    ColumnMismatch { msa_ncol: usize, raw_ncol: usize },

    #[error("Ancestral sequence has {seq_ncol} columns while the alignment has {msa_ncol}")]
    AncestorLengthMismatch { msa_ncol: usize, seq_ncol: usize },

    #[error("Weight vector has {weights} entries for {nrow} alignment rows")]
    WeightLengthMismatch { nrow: usize, weights: usize },
}
