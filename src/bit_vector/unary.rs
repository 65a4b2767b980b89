//! Iterator over set-bit positions.

use crate::bit_vector::WORD_LEN;
use crate::broadword;
use crate::BitVector;

/// Iterator over the positions of set bits, in increasing order.
///
/// Words are scanned once, so exhausting the iterator over a sequence of
/// `m` bits costs O(m/64) plus one step per set bit.
///
/// # Examples
///
/// ```
/// use cellfind::BitVector;
///
/// let bv = BitVector::from_bits([false, true, false, false, true]);
/// let mut it = bv.unary_iter();
///
/// assert_eq!(it.next(), Some(1));
/// assert_eq!(it.next(), Some(4));
/// assert_eq!(it.next(), None);
/// ```
pub struct UnaryIter<'a> {
    bv: &'a BitVector,
    word_pos: usize,
    buf: usize,
}

impl<'a> UnaryIter<'a> {
    /// Creates the iterator positioned at the first bit.
    pub fn new(bv: &'a BitVector) -> Self {
        let buf = bv.words().first().copied().unwrap_or(0);
        Self {
            bv,
            word_pos: 0,
            buf,
        }
    }
}

impl<'a> Iterator for UnaryIter<'a> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        while self.buf == 0 {
            self.word_pos += 1;
            if self.bv.words().len() <= self.word_pos {
                return None;
            }
            self.buf = self.bv.words()[self.word_pos];
        }
        let shift = broadword::lsb(self.buf).unwrap();
        self.buf &= self.buf - 1; // clear the lowest set bit
        Some(self.word_pos * WORD_LEN + shift)
    }
}
