//! The stored unit of the index: one encoded posting per (gene, cell-type)
//! pair.

use std::mem::size_of;

use anyhow::Result;

use crate::elias_fano::EliasFano;
use crate::quantile::Quantile;

/// Encoded set of expressing-cell ordinals for one (gene, cell-type) pair,
/// together with its quantized magnitudes and scoring weight.
///
/// A record is immutable once built: it owns its Elias-Fano halves and
/// quantile buffer, and exposes only decoding and read accessors. The
/// `idf` weight is `log2(n / k)` for a slice of `n` cells with `k` of them
/// expressing, precomputed at encoding time.
///
/// # Examples
///
/// ```
/// use cellfind::PostingRecord;
///
/// let values = vec![1.5, 0.0, 0.0, 0.0, 2.5, 0.0, 4.0, 0.0];
/// let posting = PostingRecord::encode(&[1, 5, 7], &values, 8)?;
///
/// assert_eq!(posting.decode(), vec![1, 5, 7]);
/// assert_eq!(posting.len(), 3);
/// assert!(posting.idf() > 0.0);
/// # anyhow::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PostingRecord {
    ef: EliasFano,
    idf: f64,
    expr: Quantile,
}

impl PostingRecord {
    /// Encodes the expressing positions `ids` (1-based, strictly
    /// increasing) of the full row `values` from a slice of `universe`
    /// cells.
    ///
    /// # Errors
    ///
    /// An error is returned if `ids` is empty or not a valid input for
    /// [`EliasFano::encode`].
    pub fn encode(ids: &[u32], values: &[f64], universe: usize) -> Result<Self> {
        let ef = EliasFano::encode(ids, universe)?;
        let idf = (universe as f64 / ids.len() as f64).log2();
        let expr = Quantile::encode(values, ids);
        Ok(Self { ef, idf, expr })
    }

    /// Decodes the stored cell ordinals.
    pub fn decode(&self) -> Vec<u32> {
        self.ef.decode()
    }

    /// Gets the number of expressing cells.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ef.len()
    }

    /// Checks if the record is empty. Always false, kept for API symmetry.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ef.is_empty()
    }

    /// Gets the lower-bits width `l` of the ordinal encoding.
    #[inline(always)]
    pub const fn low_len(&self) -> usize {
        self.ef.low_len()
    }

    /// Gets the inverse-document-frequency weight `log2(n / k)`.
    #[inline(always)]
    pub const fn idf(&self) -> f64 {
        self.idf
    }

    /// Gets the quantile index of the 0-based cell position `pos`.
    #[inline(always)]
    pub fn quantile_at(&self, pos: usize) -> u8 {
        self.expr.get(pos)
    }

    /// Gets the quantized magnitudes.
    pub const fn quantile(&self) -> &Quantile {
        &self.expr
    }

    /// Conservative estimate of the heap bytes held by the record.
    pub fn size_in_bytes(&self) -> usize {
        self.ef.size_in_bytes() + self.expr.size_in_bytes() + size_of::<Self>()
    }
}
