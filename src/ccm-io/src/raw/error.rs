use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawError {
    #[error("Failed to access raw parameter file {path:?}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Raw parameter file {path:?} line {line}: expected {expected} fields, found {found}")]
    FieldCount { path: PathBuf, line: usize, expected: usize, found: usize },

    #[error("Raw parameter file {path:?} line {line}: {value:?} is not a floating point number")]
    InvalidFloat { path: PathBuf, line: usize, value: String },

    #[error("Raw parameter file {path:?} line {line}: malformed pair block header")]
    MalformedHeader { path: PathBuf, line: usize },

    #[error("Raw parameter file {path:?}: pair block ({i}, {j}) is out of range for {ncol} columns")]
    BlockOutOfRange { path: PathBuf, i: usize, j: usize, ncol: usize },

    #[error("Raw parameter file {path:?} ended in the middle of pair block ({i}, {j})")]
    TruncatedBlock { path: PathBuf, i: usize, j: usize },

    #[error("Raw parameter file {path:?} does not contain any single potentials")]
    Empty { path: PathBuf },

    #[error("Raw parameter file {path:?} carries an invalid metadata block")]
    InvalidMeta { path: PathBuf, source: serde_json::Error },

    #[error("Failed to decode msgpack parameter file {path:?}")]
    MsgpackDecode { path: PathBuf, source: rmp_serde::decode::Error },

    #[error("Failed to encode msgpack parameter file {path:?}")]
    MsgpackEncode { path: PathBuf, source: rmp_serde::encode::Error },
}
