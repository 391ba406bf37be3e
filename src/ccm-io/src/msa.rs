//! Alignment file reading and writing.
//!
//! Two formats are supported: `psicov` (one aligned sequence per line, no
//! identifiers) and `fasta`. Both are decoded into the integer alphabet of
//! [`alignment::alphabet`]; characters outside the twenty amino acids are
//! mapped to the gap state with a single warning per file.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;

use alignment::alphabet;
use alignment::msa::{Msa, MsaError};

/// Alignment file format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlnFormat {
    Psicov,
    Fasta,
}

impl std::str::FromStr for AlnFormat {
    type Err = MsaReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "psicov" => Ok(Self::Psicov),
            "fasta"  => Ok(Self::Fasta),
            other    => Err(MsaReadError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum MsaReadError {
    #[error("Failed to access alignment file {path:?}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Alignment file {path:?} is malformed")]
    Malformed { path: PathBuf, source: MsaError },

    #[error("Alignment file {path:?}: sequence data before the first '>' header")]
    HeaderlessSequence { path: PathBuf },

    #[error("Unknown alignment format '{0}' (expected 'psicov' or 'fasta')")]
    UnknownFormat(String),
}

/// Read an alignment, returning the encoded MSA and, for formats that carry
/// them, the sequence identifiers.
pub fn read_msa(path: &Path, format: AlnFormat) -> Result<(Msa, Option<Vec<String>>), MsaReadError> {
    let io_err = |source| MsaReadError::Io { path: path.to_path_buf(), source };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut rows: Vec<String> = Vec::new();
    let mut ids: Vec<String> = Vec::new();

    match format {
        AlnFormat::Psicov => {
            for line in reader.lines() {
                let line = line.map_err(io_err)?;
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                rows.push(line.to_string());
            }
        }
        AlnFormat::Fasta => {
            for line in reader.lines() {
                let line = line.map_err(io_err)?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(header) = line.strip_prefix('>') {
                    ids.push(header.split_whitespace().next().unwrap_or("").to_string());
                    rows.push(String::new());
                } else {
                    match rows.last_mut() {
                        Some(seq) => seq.push_str(line),
                        None => return Err(MsaReadError::HeaderlessSequence { path: path.to_path_buf() }),
                    }
                }
            }
        }
    }

    let unknown = rows.iter()
        .flat_map(|row| row.bytes())
        .filter(|&c| alphabet::is_gap_char(c) && c != b'-' && c != b'.')
        .count();
    if unknown > 0 {
        warn!("{unknown} non-standard residue characters in {path:?} were encoded as gaps");
    }

    let msa = Msa::from_chars(&rows)
        .map_err(|source| MsaReadError::Malformed { path: path.to_path_buf(), source })?;
    let ids = if ids.is_empty() { None } else { Some(ids) };
    Ok((msa, ids))
}

/// Write an alignment in psicov format (one sequence per line).
pub fn write_psicov(path: &Path, msa: &Msa) -> Result<(), MsaReadError> {
    let io_err = |source| MsaReadError::Io { path: path.to_path_buf(), source };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for s in 0..msa.nrow() {
        writeln!(writer, "{}", msa.decode_row(s)).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psicov_roundtrip() -> Result<(), MsaReadError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.psc");
        std::fs::write(&path, "ARND-\nQEGHH\n").unwrap();

        let (msa, ids) = read_msa(&path, AlnFormat::Psicov)?;
        assert!(ids.is_none());
        assert_eq!(msa.nrow(), 2);
        assert_eq!(msa.decode_row(0), "ARND-");

        let out = dir.path().join("out.psc");
        write_psicov(&out, &msa)?;
        let (back, _) = read_msa(&out, AlnFormat::Psicov)?;
        assert_eq!(back, msa);
        Ok(())
    }

    #[test]
    fn fasta_reads_identifiers_and_multiline_sequences() -> Result<(), MsaReadError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.fa");
        std::fs::write(&path, ">seq1 first\nARN\nD-\n>seq2\nQEGHH\n").unwrap();

        let (msa, ids) = read_msa(&path, AlnFormat::Fasta)?;
        assert_eq!(ids, Some(vec!["seq1".to_string(), "seq2".to_string()]));
        assert_eq!(msa.decode_row(0), "ARND-");
        Ok(())
    }

    #[test]
    fn fasta_without_header_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.fa");
        std::fs::write(&path, "ARND-\n").unwrap();
        assert!(matches!(
            read_msa(&path, AlnFormat::Fasta),
            Err(MsaReadError::HeaderlessSequence { .. })
        ));
    }

    #[test]
    fn format_selector_parses() {
        assert_eq!("psicov".parse::<AlnFormat>().unwrap(), AlnFormat::Psicov);
        assert_eq!("FASTA".parse::<AlnFormat>().unwrap(), AlnFormat::Fasta);
        assert!(matches!("a3m".parse::<AlnFormat>(), Err(MsaReadError::UnknownFormat(_))));
    }
}
