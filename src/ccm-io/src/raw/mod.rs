use std::fs::File;
use std::io::Read;
use std::path::Path;

use alignment::alphabet::{NUM_STATES};
use alignment::counts::pair_idx;
use potts::PottsParams;

mod text;
mod msgpack;
mod error;

pub use error::RawError;

/// Run metadata attached to parameter files: an opaque key/value block.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Raw Potts potentials, the on-disk parameter model.
///
/// Unlike [`potts::PottsParams`], the single potentials carry an explicit
/// (zero) gap column so that the file contents are self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPotts {
    ncol: usize,
    /// `L x 21`, flat.
    pub v: Vec<f64>,
    /// `L x L x 21 x 21`, flat.
    pub w: Vec<f64>,
    pub meta: Meta,
}

impl RawPotts {
    #[must_use]
    pub fn new(ncol: usize, v: Vec<f64>, w: Vec<f64>, meta: Meta) -> Self {
        debug_assert_eq!(v.len(), ncol * NUM_STATES);
        debug_assert_eq!(w.len(), ncol * ncol * NUM_STATES * NUM_STATES);
        Self { ncol, v, w, meta }
    }

    #[must_use]
    pub fn from_params(params: &PottsParams, meta: Meta) -> Self {
        Self {
            ncol: params.ncol(),
            v: params.v_with_gap(),
            w: params.w.clone(),
            meta,
        }
    }

    /// Structured parameters: gap column clipped from the singles.
    #[must_use]
    pub fn to_params(&self) -> PottsParams {
        let mut params = PottsParams::zeroed(self.ncol);
        params.v = PottsParams::v_from_padded(self.ncol, &self.v);
        params.w.copy_from_slice(&self.w);
        params
    }

    #[must_use] pub fn ncol(&self) -> usize { self.ncol }

    #[inline]
    #[must_use]
    pub fn w_at(&self, i: usize, j: usize, a: usize, b: usize) -> f64 {
        self.w[pair_idx(self.ncol, i, j, a, b)]
    }

    /// Largest absolute difference against another parameter set.
    /// Used by the `--compare-to-raw` debug output.
    #[must_use]
    pub fn max_abs_deviation(&self, other: &Self) -> f64 {
        let dv = self.v.iter().zip(other.v.iter()).map(|(a, b)| (a - b).abs());
        let dw = self.w.iter().zip(other.w.iter()).map(|(a, b)| (a - b).abs());
        dv.chain(dw).fold(0.0, f64::max)
    }
}

/// Parse a raw parameter file, sniffing the format: msgpack payloads start
/// with a map marker (`>= 0x80`), the text format with ASCII.
pub fn parse(path: &Path) -> Result<RawPotts, RawError> {
    let mut first = [0u8; 1];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut first))
        .map_err(|source| RawError::Io { path: path.to_path_buf(), source })?;

    if first[0] >= 0x80 {
        msgpack::read(path)
    } else {
        text::read(path)
    }
}

/// Write the textual ("oldraw") format.
pub fn write_oldraw(path: &Path, raw: &RawPotts) -> Result<(), RawError> {
    text::write(path, raw)
}

/// Write the binary msgpack format.
pub fn write_msgpack(path: &Path, raw: &RawPotts) -> Result<(), RawError> {
    msgpack::write(path, raw)
}
