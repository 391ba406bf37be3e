//! Contact matrix files: a whitespace-delimited `L x L` block of doubles,
//! one row per line, with an optional trailing `#>META> <json>` line.
//! Filenames ending in `.gz` are transparently (de)compressed.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use gzp::deflate::Gzip;
use gzp::par::compress::{ParCompress, ParCompressBuilder};
use gzp::ZWriter;
use thiserror::Error;

use crate::raw::Meta;

const META_PREFIX: &str = "#>META>";

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Failed to access matrix file {path:?}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error("Failed to finalize compressed matrix file {path:?}")]
    Compression { path: std::path::PathBuf, source: gzp::GzpError },

    #[error("Matrix file {path:?} line {line}: {value:?} is not a floating point number")]
    InvalidFloat { path: std::path::PathBuf, line: usize, value: String },

    #[error("Matrix file {path:?} is not square: {nrow} rows, {ncol} columns")]
    NotSquare { path: std::path::PathBuf, nrow: usize, ncol: usize },

    #[error("Matrix file {path:?} line {line}: expected {expected} fields, found {found}")]
    RaggedRow { path: std::path::PathBuf, line: usize, expected: usize, found: usize },

    #[error("Matrix file {path:?} does not contain any values")]
    Empty { path: std::path::PathBuf },

    #[error("Matrix file {path:?} carries an invalid metadata block")]
    InvalidMeta { path: std::path::PathBuf, source: serde_json::Error },
}

enum MatSink {
    Plain(BufWriter<File>),
    Gzipped(ParCompress<Gzip>),
}

impl Write for MatSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzipped(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzipped(w) => w.flush(),
        }
    }
}

/// Write an `L x L` score matrix, appending the metadata trailer.
pub fn write_matrix(path: &Path, mat: &[f64], ncol: usize, meta: &Meta) -> Result<(), MatrixError> {
    debug_assert_eq!(mat.len(), ncol * ncol);
    let io_err = |source| MatrixError::Io { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(io_err)?;
    let mut sink = if is_gzipped(path) {
        MatSink::Gzipped(ParCompressBuilder::new().from_writer(file))
    } else {
        MatSink::Plain(BufWriter::new(file))
    };

    for row in mat.chunks_exact(ncol) {
        let fields: Vec<String> = row.iter().map(|value| format!("{value:.16e}")).collect();
        writeln!(sink, "{}", fields.join(" ")).map_err(io_err)?;
    }

    if !meta.is_empty() {
        let json = serde_json::to_string(meta)
            .map_err(|source| MatrixError::InvalidMeta { path: path.to_path_buf(), source })?;
        writeln!(sink, "{META_PREFIX} {json}").map_err(io_err)?;
    }

    match sink {
        MatSink::Plain(mut w) => w.flush().map_err(io_err),
        MatSink::Gzipped(mut w) => w
            .finish()
            .map_err(|source| MatrixError::Compression { path: path.to_path_buf(), source }),
    }
}

/// Read a matrix file back, tolerating `.gz` compression and a missing
/// metadata line.
pub fn read_matrix(path: &Path) -> Result<(Vec<f64>, usize, Meta), MatrixError> {
    let io_err = |source| MatrixError::Io { path: path.to_path_buf(), source };

    let file = File::open(path).map_err(io_err)?;
    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut values = Vec::new();
    let mut nrow = 0;
    let mut width = None;
    let mut meta = Meta::new();

    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(json) = line.strip_prefix(META_PREFIX) {
            meta = serde_json::from_str(json.trim())
                .map_err(|source| MatrixError::InvalidMeta { path: path.to_path_buf(), source })?;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let expected = *width.get_or_insert(fields.len());
        if fields.len() != expected {
            return Err(MatrixError::RaggedRow {
                path: path.to_path_buf(),
                line: lineno + 1,
                expected,
                found: fields.len(),
            });
        }
        for field in fields {
            values.push(field.parse::<f64>().map_err(|_| MatrixError::InvalidFloat {
                path: path.to_path_buf(),
                line: lineno + 1,
                value: field.to_string(),
            })?);
        }
        nrow += 1;
    }

    let Some(ncol) = width else {
        return Err(MatrixError::Empty { path: path.to_path_buf() });
    };
    if nrow != ncol {
        return Err(MatrixError::NotSquare { path: path.to_path_buf(), nrow, ncol });
    }
    Ok((values, ncol, meta))
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> Meta {
        let mut meta = Meta::new();
        meta.insert("objective".to_string(), serde_json::json!("pll"));
        meta.insert("neff".to_string(), serde_json::json!(12.5));
        meta
    }

    #[test]
    fn plain_roundtrip() -> Result<(), MatrixError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.mat");

        let mat = vec![0.0, 2.0, 2.0, 0.0];
        write_matrix(&path, &mat, 2, &sample_meta())?;

        let (back, ncol, meta) = read_matrix(&path)?;
        assert_eq!(ncol, 2);
        assert_eq!(back, mat);
        assert_eq!(meta, sample_meta());
        Ok(())
    }

    #[test]
    fn gzipped_roundtrip() -> Result<(), MatrixError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.mat.gz");

        let mat: Vec<f64> = (0..9).map(f64::from).collect();
        write_matrix(&path, &mat, 3, &Meta::new())?;

        let (back, ncol, meta) = read_matrix(&path)?;
        assert_eq!(ncol, 3);
        assert_eq!(back, mat);
        assert!(meta.is_empty());
        Ok(())
    }

    #[test]
    fn non_square_matrix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.mat");
        std::fs::write(&path, "1.0 2.0 3.0\n4.0 5.0 6.0\n").unwrap();
        assert!(matches!(read_matrix(&path), Err(MatrixError::NotSquare { nrow: 2, ncol: 3, .. })));
    }
}
