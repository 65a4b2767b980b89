//! Elias-Fano coding of strictly increasing cell-ordinal sequences.

use anyhow::{anyhow, Result};

use crate::BitVector;

/// Elias-Fano representation of a strictly increasing sequence of positive
/// integers drawn from a universe of `n` cells.
///
/// Each integer `x` is split at a width `l` chosen from the sequence
/// density: the `l` least-significant bits go to the `low` half verbatim
/// (least-significant-bit first, `l` bits per element), while the remaining
/// upper part `u = x >> l` is gap-coded in unary into the `high` half, i.e.
/// `u[i] - u[i-1]` zeros followed by a single one per element. The position
/// of the `i`-th set bit in `high` is therefore `u[i] + i`, and the halves
/// together take `l * k + u[k-1] + k` bits for `k` stored elements.
///
/// The codec is stateless: both halves are a pure function of the input
/// sequence and the universe size. The low-bit order is part of the
/// contract; [`Self::decode`] reassembles elements with the same
/// least-significant-first convention.
///
/// # Examples
///
/// ```
/// use cellfind::EliasFano;
///
/// let ef = EliasFano::encode(&[1, 3, 5, 7], 8)?;
/// assert_eq!(ef.low_len(), 2);
/// assert_eq!(ef.decode(), vec![1, 3, 5, 7]);
/// # anyhow::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliasFano {
    high: BitVector,
    low: BitVector,
    low_len: usize,
}

impl EliasFano {
    /// Encodes the strictly increasing sequence `ids` of positive integers,
    /// where `universe` is the total number of cells in the enclosing slice
    /// (so every element lies in `1..=universe`).
    ///
    /// The split width is `l = round(log2(universe / k)) + 1` for `k`
    /// stored elements, hence always at least 1.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    /// - `ids` is empty,
    /// - `ids` is not strictly increasing or contains zero, or
    /// - an element exceeds `universe`.
    pub fn encode(ids: &[u32], universe: usize) -> Result<Self> {
        if ids.is_empty() {
            return Err(anyhow!("ids must not be empty."));
        }
        let mut prev = 0;
        for &id in ids {
            if id as usize <= prev {
                return Err(anyhow!(
                    "ids must be positive and strictly increasing, got {id} after {prev}."
                ));
            }
            prev = id as usize;
        }
        if prev > universe {
            return Err(anyhow!(
                "ids must not exceed the universe size {universe}, got {prev}."
            ));
        }

        let k = ids.len();
        let last = prev;
        let low_len = Self::split_width(universe, k);
        let low_mask = (1usize << low_len) - 1;

        let mut low = BitVector::new();
        let mut high = BitVector::with_len((last >> low_len) + k);
        for (i, &id) in ids.iter().enumerate() {
            low.push_bits(id as usize & low_mask, low_len);
            high.set_bit((id as usize >> low_len) + i, true);
        }

        Ok(Self { high, low, low_len })
    }

    /// Decodes the stored sequence.
    ///
    /// The `high` half is walked through its set bits: the `i`-th set bit at
    /// position `p` recovers the upper part `u = p - i`, which is glued to
    /// the `i`-th `l`-bit chunk of the `low` half.
    pub fn decode(&self) -> Vec<u32> {
        let mut ids = Vec::with_capacity(self.len());
        for (i, pos) in self.high.unary_iter().enumerate() {
            let upper = pos - i;
            let lower = self.low.get_bits(i * self.low_len, self.low_len);
            ids.push(((upper << self.low_len) | lower) as u32);
        }
        ids
    }

    /// Gets the number of stored elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.low.len() / self.low_len
    }

    /// Checks if no elements are stored. Always false for an encoded
    /// posting, since empty sequences are rejected by [`Self::encode`].
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    /// Gets the lower-bits width `l`.
    #[inline(always)]
    pub const fn low_len(&self) -> usize {
        self.low_len
    }

    /// Gets the unary-coded upper half.
    pub const fn high(&self) -> &BitVector {
        &self.high
    }

    /// Gets the packed lower half.
    pub const fn low(&self) -> &BitVector {
        &self.low
    }

    /// Returns the number of heap bytes backing both halves.
    pub fn size_in_bytes(&self) -> usize {
        self.high.size_in_bytes() + self.low.size_in_bytes()
    }

    fn split_width(universe: usize, k: usize) -> usize {
        let width = ((universe as f64 / k as f64).log2() + 0.5).floor() as usize + 1;
        width.max(1)
    }
}
