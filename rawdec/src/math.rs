//! Small numeric helpers shared by the decoders.

/// Convert between integer types, asserting that no information is lost.
///
/// A failing conversion indicates a bug in the caller, never malformed input.
#[inline(always)]
pub(crate) fn lossless_cast<T, U>(value: T) -> U
where
    T: Copy + core::fmt::Debug,
    U: TryFrom<T>,
{
    match U::try_from(value) {
        Ok(v) => v,
        Err(_) => panic!("lossy conversion of {value:?}"),
    }
}

/// Clamp `value` into the range of an unsigned `bits`-wide integer.
#[inline(always)]
pub(crate) fn clamp_bits(value: i32, bits: u32) -> u16 {
    debug_assert!(bits <= 16);

    value.clamp(0, (1 << bits) - 1) as u16
}

/// The number of bits needed to represent `value`.
#[inline(always)]
pub(crate) fn num_active_bits(value: u16) -> u32 {
    u16::BITS - value.leading_zeros()
}

/// Take the `nbits` most significant bits of a value that is `effective_bits` wide.
#[inline(always)]
pub(crate) fn extract_high_bits(value: u32, nbits: u32, effective_bits: u32) -> u32 {
    debug_assert!(nbits <= effective_bits && effective_bits <= 32);

    value >> (effective_bits - nbits)
}

/// Round `value` up to the next multiple of `multiple`.
#[inline]
pub(crate) fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// The smallest `n` such that `1 << n >= value`.
#[inline]
pub(crate) fn log2_ceil(value: u32) -> u32 {
    if value <= 1 {
        return 0;
    }

    u32::BITS - (value - 1).leading_zeros()
}
