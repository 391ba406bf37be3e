//! The binary msgpack parameter format: the same logical triple as the
//! textual format, serialized as a named-field map.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Meta, RawError, RawPotts};

/// On-disk shape of a msgpack parameter file.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    format: String,
    ncol: u64,
    x_single: Vec<f64>,
    x_pair: Vec<f64>,
    meta: Meta,
}

const FORMAT_TAG: &str = "potts-msgpack";

pub fn read(path: &Path) -> Result<RawPotts, RawError> {
    let file = File::open(path).map_err(|source| RawError::Io { path: path.to_path_buf(), source })?;
    let record: Record = rmp_serde::from_read(BufReader::new(file))
        .map_err(|source| RawError::MsgpackDecode { path: path.to_path_buf(), source })?;

    Ok(RawPotts::new(record.ncol as usize, record.x_single, record.x_pair, record.meta))
}

pub fn write(path: &Path, raw: &RawPotts) -> Result<(), RawError> {
    let record = Record {
        format: FORMAT_TAG.to_string(),
        ncol: raw.ncol() as u64,
        x_single: raw.v.clone(),
        x_pair: raw.w.clone(),
        meta: raw.meta.clone(),
    };

    let file = File::create(path).map_err(|source| RawError::Io { path: path.to_path_buf(), source })?;
    let mut writer = BufWriter::new(file);
    rmp_serde::encode::write_named(&mut writer, &record)
        .map_err(|source| RawError::MsgpackEncode { path: path.to_path_buf(), source })
}
