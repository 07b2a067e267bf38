//! Precomputed lookup tables indexed by a fixed number of bits.

use crate::math::extract_high_bits;
use core::ops::Index;

/// A table with `1 << BITS` entries, built once from a closure.
#[derive(Debug, Clone)]
pub(crate) struct SimpleLut<T, const BITS: u32> {
    table: Box<[T]>,
}

impl<T: Copy, const BITS: u32> SimpleLut<T, BITS> {
    /// The number of entries in the table.
    pub(crate) const SIZE: usize = 1 << BITS;

    /// Build the table by evaluating `f(index, size)` for every index.
    pub(crate) fn new(f: impl Fn(usize, usize) -> T) -> Self {
        let table = (0..Self::SIZE).map(|i| f(i, Self::SIZE)).collect();

        Self { table }
    }
}

impl<T, const BITS: u32> Index<usize> for SimpleLut<T, BITS> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.table[index]
    }
}

/// The sentinel returned by the bit-width table when no set bit is found.
pub(crate) const HIGH_NOT_FOUND: u8 = 12;

/// Build the table mapping a 12-bit pattern to the position of its first set bit,
/// counted from the most significant end.
pub(crate) fn high_bit_table() -> SimpleLut<u8, 12> {
    SimpleLut::new(|i, _| {
        let mut high = 0;

        while high < HIGH_NOT_FOUND {
            if extract_high_bits(i as u32, high as u32, 11) & 1 != 0 {
                break;
            }

            high += 1;
        }

        high
    })
}
