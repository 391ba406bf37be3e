use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("{0} objective functions requested; pick exactly one of --ofn-pll, --ofn-cd, --ofn-tree-cd, --ofn-triplet")]
    MultipleObjectives(usize),

    #[error("Need at least one output: --write-apc-matrix, --write-matrix, --write-raw, --write-msgpack or --write-triplets")]
    NoOutputRequested,

    #[error("--write-cd-alignment is only supported for (tree) contrastive divergence")]
    CdAlignmentWithoutCd,
}
