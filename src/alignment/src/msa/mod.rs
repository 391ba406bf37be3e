use crate::alphabet::{self, NUM_STATES};

mod error;
pub use error::MsaError;

/// An integer-encoded multiple sequence alignment.
///
/// Sequences are stored row-major; each symbol is a state index in `0..=20`
/// (see [`crate::alphabet`]). `N` rows of `L` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msa {
    nrow: usize,
    ncol: usize,
    data: Vec<u8>,
}

impl Msa {
    /// Build an alignment from pre-encoded rows.
    ///
    /// # Errors
    /// - [`MsaError::EmptyAlignment`] when no rows are provided.
    /// - [`MsaError::RaggedRow`] when a row's length differs from the first row.
    /// - [`MsaError::InvalidState`] when a symbol lies outside `0..=20`.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, MsaError> {
        let ncol = match rows.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err(MsaError::EmptyAlignment),
        };

        let nrow = rows.len();
        let mut data = Vec::with_capacity(nrow * ncol);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != ncol {
                return Err(MsaError::RaggedRow { row: i, expected: ncol, found: row.len() });
            }
            if let Some(&state) = row.iter().find(|&&s| s >= NUM_STATES as u8) {
                return Err(MsaError::InvalidState { row: i, state });
            }
            data.extend_from_slice(&row);
        }
        Ok(Self { nrow, ncol, data })
    }

    /// Encode an alignment from character rows (one string per sequence).
    /// Unknown residue characters are mapped to the gap state.
    pub fn from_chars<S: AsRef<[u8]>>(rows: &[S]) -> Result<Self, MsaError> {
        let encoded = rows.iter()
            .map(|row| row.as_ref().iter().map(|&c| alphabet::char_to_state(c)).collect())
            .collect();
        Self::from_rows(encoded)
    }

    /// An `nrow` x `ncol` alignment filled with a single state.
    #[must_use]
    pub fn filled(nrow: usize, ncol: usize, state: u8) -> Self {
        Self { nrow, ncol, data: vec![state; nrow * ncol] }
    }

    #[must_use] pub fn nrow(&self) -> usize { self.nrow }
    #[must_use] pub fn ncol(&self) -> usize { self.ncol }

    /// Immutable view over sequence `s`.
    #[must_use]
    pub fn row(&self, s: usize) -> &[u8] {
        &self.data[s * self.ncol..(s + 1) * self.ncol]
    }

    /// Mutable view over sequence `s`.
    pub fn row_mut(&mut self, s: usize) -> &mut [u8] {
        &mut self.data[s * self.ncol..(s + 1) * self.ncol]
    }

    #[must_use]
    pub fn get(&self, s: usize, i: usize) -> u8 {
        self.data[s * self.ncol + i]
    }

    pub fn set(&mut self, s: usize, i: usize, state: u8) {
        self.data[s * self.ncol + i] = state;
    }

    /// Iterate over all rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.ncol)
    }

    /// Split the alignment into disjoint mutable row slices.
    /// Required when resampling sequences in parallel.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(self.ncol)
    }

    /// Parallel variant of [`Msa::rows_mut`].
    pub fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, u8> {
        use rayon::prelude::*;
        self.data.par_chunks_exact_mut(self.ncol)
    }

    /// Replicate every row `factor` times (block-wise: the full alignment
    /// is repeated, not individual rows).
    #[must_use]
    pub fn tile(&self, factor: usize) -> Self {
        let mut data = Vec::with_capacity(self.data.len() * factor);
        for _ in 0..factor {
            data.extend_from_slice(&self.data);
        }
        Self { nrow: self.nrow * factor, ncol: self.ncol, data }
    }

    /// Decode row `s` back into alignment characters.
    #[must_use]
    pub fn decode_row(&self, s: usize) -> String {
        self.row(s).iter().map(|&st| alphabet::state_to_char(st) as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chars_encodes_sequences() -> Result<(), MsaError> {
        let msa = Msa::from_chars(&["ARN-", "AAAA"])?;
        assert_eq!(msa.nrow(), 2);
        assert_eq!(msa.ncol(), 4);
        assert_eq!(msa.row(0), &[0, 1, 2, 20]);
        assert_eq!(msa.row(1), &[0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Msa::from_chars(&["ARN", "AR"]).unwrap_err();
        assert!(matches!(err, MsaError::RaggedRow { row: 1, expected: 3, found: 2 }));
    }

    #[test]
    fn empty_alignment_is_rejected() {
        assert!(matches!(Msa::from_chars::<&str>(&[]), Err(MsaError::EmptyAlignment)));
    }

    #[test]
    fn tile_replicates_blockwise() -> Result<(), MsaError> {
        let msa = Msa::from_rows(vec![vec![0, 1], vec![2, 3]])?;
        let tiled = msa.tile(2);
        assert_eq!(tiled.nrow(), 4);
        assert_eq!(tiled.row(2), &[0, 1]);
        assert_eq!(tiled.row(3), &[2, 3]);
        Ok(())
    }

    #[test]
    fn decode_roundtrip() -> Result<(), MsaError> {
        let msa = Msa::from_chars(&["ARNDC", "QEGH-"])?;
        assert_eq!(msa.decode_row(0), "ARNDC");
        assert_eq!(msa.decode_row(1), "QEGH-");
        Ok(())
    }
}
