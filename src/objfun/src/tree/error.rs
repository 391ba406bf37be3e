use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Unexpected character {found:?} at byte {at} of the newick string")]
    UnexpectedCharacter { at: usize, found: char },

    #[error("Newick string ended before the tree was closed")]
    UnexpectedEnd,

    #[error("Invalid branch length {value:?} at byte {at}")]
    InvalidBranchLength { at: usize, value: String },

    #[error("Trailing characters after the closing ';'")]
    TrailingCharacters,

    #[error("No clade named '{0}' in the tree")]
    UnknownCladeId(String),
}
