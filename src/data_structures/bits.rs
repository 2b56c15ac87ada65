/// Widest signal the simulator supports.
pub const MAX_BITS: u8 = 64;

/// Returns the index and mask necessary to access the bit at `index` in a ```&[u64]```.
///
/// # Example
///
/// ```
/// # use digisim::data_structures::word_mask_64;
/// let word_slice = [0u64, 1u64];
/// let bit_index = 64;
///
/// let (word_index, mask) = word_mask_64(bit_index);
/// let bit_set = (word_slice[word_index] & mask) != 0;
///
/// assert_eq!(bit_set, true);
/// ```
#[inline(always)]
pub fn word_mask_64(index: usize) -> (usize, u64) {
    (index / 64, 1 << (index % 64))
}

/// Returns a mask with the lowest `bits` bits set.
///
/// # Example
///
/// ```
/// # use digisim::data_structures::mask;
/// assert_eq!(mask(1), 0b1);
/// assert_eq!(mask(4), 0b1111);
/// assert_eq!(mask(64), u64::MAX);
/// ```
#[inline(always)]
pub fn mask(bits: u8) -> u64 {
    if bits >= MAX_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Iterates over the lowest `bits` bits of a value, least significant bit first.
///
/// Being a [DoubleEndedIterator], `.rev()` walks the same bits most significant first,
/// which is the order truth table variables are laid out in.
///
/// # Example
/// ```
/// # use digisim::data_structures::BitIter;
/// let bits: Vec<bool> = BitIter::new(0b011, 3).collect();
/// assert_eq!(bits, [true, true, false]);
///
/// let msb_first: Vec<bool> = BitIter::new(0b011, 3).rev().collect();
/// assert_eq!(msb_first, [false, true, true]);
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BitIter {
    value: u64,
    front: u8,
    back: u8,
}
impl BitIter {
    /// Returns a new [BitIter] over the lowest `bits` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `bits` > 64.
    pub fn new(value: u64, bits: u8) -> Self {
        assert!(
            bits <= MAX_BITS,
            "Can't iterate over {} bits of a u64",
            bits
        );
        Self {
            value,
            front: 0,
            back: bits,
        }
    }
}

impl Iterator for BitIter {
    type Item = bool;
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let bit = (self.value >> self.front) & 1 == 1;
        self.front += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.back - self.front) as usize;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for BitIter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some((self.value >> self.back) & 1 == 1)
    }
}

impl ExactSizeIterator for BitIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        for bits in 1..64 {
            assert_eq!(mask(bits).count_ones(), bits as u32);
            assert_eq!(mask(bits) + 1, 1 << bits);
        }
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn test_bit_iter_full_width() {
        let n = 1u64 << 63 | 0b101;
        let bits: Vec<_> = BitIter::new(n, 64).collect();
        assert_eq!(bits.len(), 64);
        assert!(bits[0]);
        assert!(!bits[1]);
        assert!(bits[2]);
        assert!(bits[63]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 3);
    }

    #[test]
    fn test_bit_iter_meets_in_the_middle() {
        let mut iter = BitIter::new(0b1001, 4);
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(true));
        assert_eq!(iter.next_back(), Some(true));
        assert_eq!(iter.next(), Some(false));
        assert_eq!(iter.next_back(), Some(false));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_bit_iter_zero_width() {
        assert_eq!(BitIter::new(u64::MAX, 0).count(), 0);
    }
}
