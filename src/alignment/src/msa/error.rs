use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsaError {
    #[error("Alignment does not contain any sequence")]
    EmptyAlignment,

    #[error("Sequence {row} has {found} columns while the alignment has {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },

    #[error("Sequence {row} contains the invalid state index {state} (valid range: 0..=20)")]
    InvalidState { row: usize, state: u8 },
}
