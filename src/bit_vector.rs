//! Append-only bit sequence with constant-time random access.

pub mod iter;
pub mod unary;

use std::mem::size_of;

use crate::broadword;
use iter::Iter;
use unary::UnaryIter;

pub(crate) const WORD_LEN: usize = usize::BITS as usize;

/// Append-only sequence of bits packed into machine words.
///
/// [`BitVector`] is the raw substrate for the Elias-Fano halves and the
/// quantile buffers: it supports pushing single bits or fixed-width chunks
/// at the end, O(1) reads, and ordered iteration over either all bits or
/// only the set-bit positions.
///
/// # Examples
///
/// ```
/// use cellfind::BitVector;
///
/// let mut bv = BitVector::new();
/// bv.push_bit(true);
/// bv.push_bits(0b0110, 4);
///
/// assert_eq!(bv.len(), 5);
/// assert_eq!(bv.get_bit(0), true);
/// assert_eq!(bv.get_bits(1, 4), 0b0110);
/// assert_eq!(bv.unary_iter().collect::<Vec<_>>(), vec![0, 2, 3]);
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<usize>,
    len: usize,
}

impl BitVector {
    /// Creates an empty [`BitVector`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`BitVector`] of `len` unset bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; Self::words_for(len)],
            len,
        }
    }

    /// Creates a [`BitVector`] from a list of bits.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut this = Self::new();
        bits.into_iter().for_each(|b| this.push_bit(b));
        this
    }

    /// Gets the `pos`-th bit.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds.
    #[inline(always)]
    pub fn get_bit(&self, pos: usize) -> bool {
        assert!(pos < self.len, "pos must be less than {}", self.len);
        (self.words[pos / WORD_LEN] >> (pos % WORD_LEN)) & 1 == 1
    }

    /// Sets the `pos`-th bit to `bit`. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds.
    #[inline(always)]
    pub fn set_bit(&mut self, pos: usize, bit: bool) {
        assert!(pos < self.len, "pos must be less than {}", self.len);
        let (word, shift) = (pos / WORD_LEN, pos % WORD_LEN);
        self.words[word] &= !(1 << shift);
        self.words[word] |= (bit as usize) << shift;
    }

    /// Pushes `bit` at the end.
    #[inline(always)]
    pub fn push_bit(&mut self, bit: bool) {
        let shift = self.len % WORD_LEN;
        if shift == 0 {
            self.words.push(bit as usize);
        } else {
            *self.words.last_mut().unwrap() |= (bit as usize) << shift;
        }
        self.len += 1;
    }

    /// Gets the `len` bits starting at the `pos`-th bit, packed
    /// least-significant-bit first.
    ///
    /// # Panics
    ///
    /// Panics if `pos + len` is out of bounds or `len` exceeds the word length.
    #[inline(always)]
    pub fn get_bits(&self, pos: usize, len: usize) -> usize {
        assert!(len <= WORD_LEN);
        assert!(pos + len <= self.len);
        if len == 0 {
            return 0;
        }
        let (block, shift) = (pos / WORD_LEN, pos % WORD_LEN);
        let mask = if len < WORD_LEN {
            (1 << len) - 1
        } else {
            usize::MAX
        };
        if shift + len <= WORD_LEN {
            self.words[block] >> shift & mask
        } else {
            (self.words[block] >> shift) | (self.words[block + 1] << (WORD_LEN - shift) & mask)
        }
    }

    /// Pushes the `len` least-significant bits of `bits` at the end,
    /// least-significant-bit first.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the word length or `bits` has set bits above `len`.
    #[inline(always)]
    pub fn push_bits(&mut self, bits: usize, len: usize) {
        assert!(len <= WORD_LEN);
        assert!(len == WORD_LEN || bits >> len == 0);
        if len == 0 {
            return;
        }
        let shift = self.len % WORD_LEN;
        if shift == 0 {
            self.words.push(bits);
        } else {
            *self.words.last_mut().unwrap() |= bits << shift;
            if len > WORD_LEN - shift {
                self.words.push(bits >> (WORD_LEN - shift));
            }
        }
        self.len += len;
    }

    /// Resizes the sequence to `len` bits, filling new positions with zeros.
    pub fn resize(&mut self, len: usize) {
        if len < self.len {
            // Clear the dropped tail so later pushes land on zeroed words.
            let shift = len % WORD_LEN;
            if shift != 0 {
                self.words[len / WORD_LEN] &= (1 << shift) - 1;
            }
        }
        self.words.resize(Self::words_for(len), 0);
        self.len = len;
    }

    /// Creates an iterator over the positions of set bits, in order.
    pub fn unary_iter(&self) -> UnaryIter {
        UnaryIter::new(self)
    }

    /// Creates an iterator over all bits, in order.
    pub fn iter(&self) -> Iter {
        Iter::new(self)
    }

    /// Gets the number of bits.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the sequence is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the number of set bits.
    pub fn num_ones(&self) -> usize {
        self.words.iter().map(|&w| broadword::popcount(w)).sum()
    }

    /// Returns the number of heap bytes backing the sequence.
    pub fn size_in_bytes(&self) -> usize {
        self.words.len() * size_of::<usize>()
    }

    #[inline(always)]
    pub(crate) fn words(&self) -> &[usize] {
        &self.words
    }

    #[inline(always)]
    const fn words_for(n: usize) -> usize {
        (n + WORD_LEN - 1) / WORD_LEN
    }
}

impl FromIterator<bool> for BitVector {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self::from_bits(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_random_bits(len: usize, seed: u64) -> Vec<bool> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen::<bool>()).collect()
    }

    fn test_bit_vector(bits: &[bool]) {
        let bv = BitVector::from_bits(bits.iter().cloned());
        assert_eq!(bits.len(), bv.len());
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(b, bv.get_bit(i));
        }

        let mut other = BitVector::with_len(bits.len());
        bits.iter()
            .enumerate()
            .for_each(|(i, &b)| other.set_bit(i, b));
        assert_eq!(bv, other);

        let ones: Vec<usize> = (0..bits.len()).filter(|&i| bits[i]).collect();
        assert_eq!(ones, bv.unary_iter().collect::<Vec<_>>());
        assert_eq!(ones.len(), bv.num_ones());
        assert_eq!(bits, bv.iter().collect::<Vec<_>>());
    }

    fn test_chunked(ints: &[usize], width: usize) {
        let mut bv = BitVector::new();
        ints.iter().for_each(|&x| bv.push_bits(x, width));
        assert_eq!(ints.len() * width, bv.len());
        for (i, &x) in ints.iter().enumerate() {
            assert_eq!(x, bv.get_bits(i * width, width));
        }
    }

    #[test]
    fn test_random_bits() {
        for seed in 0..50 {
            test_bit_vector(&gen_random_bits(5000, seed));
        }
    }

    #[test]
    fn test_random_chunks() {
        let mut rng = ChaChaRng::seed_from_u64(13);
        for _ in 0..50 {
            let width = rng.gen_range(1..32);
            let mask = (1 << width) - 1;
            let ints: Vec<usize> = (0..1000).map(|_| rng.gen::<usize>() & mask).collect();
            test_chunked(&ints, width);
        }
    }

    #[test]
    fn test_resize() {
        let mut bv = BitVector::from_bits([true, true, true]);
        bv.resize(70);
        assert_eq!(bv.len(), 70);
        assert_eq!(bv.num_ones(), 3);
        bv.set_bit(69, true);
        bv.resize(2);
        assert_eq!(bv.len(), 2);
        assert_eq!(bv.num_ones(), 2);
        bv.push_bit(false);
        assert_eq!(bv.get_bit(2), false);
    }

    #[test]
    fn test_push_across_words() {
        let mut bv = BitVector::new();
        bv.push_bits(0, 60);
        bv.push_bits(0b10111, 5);
        assert_eq!(bv.get_bits(60, 5), 0b10111);
        assert_eq!(bv.len(), 65);
    }
}
