//! An MSB-first bit reader and writer.
//!
//! The reader keeps a 64-bit cache that is replenished four bytes at a time, so that
//! the hot paths of the decoders can `fill` once and then peek and skip without any
//! further bounds checks.

/// The number of bytes pulled into the cache by a single refill.
const REFILL_BYTES: usize = 4;

/// How far (in bytes) the reader may run past the end of the input, padding with zeroes.
const MAX_SLACK: usize = 2 * REFILL_BYTES;

/// A cached MSB-first bit reader.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    cache: u64,
    fill_level: u32,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    ///
    /// Returns `None` if the input is shorter than a single refill.
    #[inline]
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < REFILL_BYTES {
            return None;
        }

        Some(Self {
            data,
            pos: 0,
            cache: 0,
            fill_level: 0,
        })
    }

    #[inline(always)]
    fn refill(&mut self) -> Option<()> {
        let mut word = [0_u8; REFILL_BYTES];

        if let Some(bytes) = self.data.get(self.pos..self.pos + REFILL_BYTES) {
            word.copy_from_slice(bytes);
        } else {
            if self.pos >= self.data.len() + MAX_SLACK {
                return None;
            }

            // Zero-pad the last few bytes.
            let tail = self.data.get(self.pos..).unwrap_or(&[]);
            word[..tail.len()].copy_from_slice(tail);
        }

        let word = u32::from_be_bytes(word) as u64;
        self.cache |= word << (32 - self.fill_level);
        self.fill_level += 32;
        self.pos += REFILL_BYTES;

        Some(())
    }

    /// Make sure that at least 32 bits are cached.
    #[inline(always)]
    pub fn fill(&mut self) -> Option<()> {
        self.fill_bits(32)
    }

    /// Make sure that at least `count` bits are cached, `count` being at most 32.
    #[inline(always)]
    pub fn fill_bits(&mut self, count: u32) -> Option<()> {
        debug_assert!(count <= 32);

        if self.fill_level < count {
            self.refill()?;
        }

        Some(())
    }

    /// Return the next `count` bits without consuming them.
    ///
    /// The bits must have been made available by a previous fill.
    #[inline(always)]
    pub fn peek_bits_no_fill(&self, count: u32) -> u32 {
        debug_assert!(count <= 32 && count <= self.fill_level);

        if count == 0 {
            return 0;
        }

        (self.cache >> (64 - count)) as u32
    }

    /// Drop the next `count` cached bits.
    #[inline(always)]
    pub fn skip_bits_no_fill(&mut self, count: u32) {
        debug_assert!(count <= 32 && count <= self.fill_level);

        self.cache <<= count;
        self.fill_level -= count;
    }

    /// Consume and return the next `count` cached bits.
    #[inline(always)]
    pub fn get_bits_no_fill(&mut self, count: u32) -> u32 {
        let bits = self.peek_bits_no_fill(count);
        self.skip_bits_no_fill(count);

        bits
    }

    /// Return the next `count` bits without consuming them, filling the cache if necessary.
    #[inline(always)]
    pub fn peek_bits(&mut self, count: u32) -> Option<u32> {
        self.fill_bits(count)?;

        Some(self.peek_bits_no_fill(count))
    }

    /// Consume and return the next `count` bits, filling the cache if necessary.
    #[inline(always)]
    pub fn get_bits(&mut self, count: u32) -> Option<u32> {
        self.fill_bits(count)?;

        Some(self.get_bits_no_fill(count))
    }

    /// Skip an arbitrary number of bits.
    pub fn skip_bits(&mut self, mut count: u32) -> Option<()> {
        while count > 0 {
            let step = count.min(32);
            self.fill_bits(step)?;
            self.skip_bits_no_fill(step);
            count -= step;
        }

        Some(())
    }

    /// Skip an arbitrary number of bytes.
    pub fn skip_bytes(&mut self, count: u32) -> Option<()> {
        self.skip_bits(count.checked_mul(8)?)
    }

    /// The number of input bytes that have been pulled into the cache so far.
    ///
    /// This can exceed the input length by the zero padding at the end.
    #[inline]
    pub fn input_position(&self) -> usize {
        self.pos
    }

    /// The number of bits that have been consumed so far.
    #[inline]
    pub fn stream_position(&self) -> usize {
        self.pos * 8 - self.fill_level as usize
    }

    /// The number of bits currently cached.
    #[inline]
    pub fn fill_level(&self) -> u32 {
        self.fill_level
    }

    /// Whether all bits of the input (excluding padding) have been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.stream_position() >= self.data.len() * 8
    }
}

/// Get the mask for the given bit size.
#[inline]
pub fn bit_mask(bit_size: u32) -> u32 {
    ((1_u64 << bit_size) - 1) as u32
}

/// An MSB-first bit writer with a variable symbol width.
///
/// Bits are gathered in a cache and drained in 32-bit chunks.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    data: Vec<u8>,
    cache: u64,
    fill_level: u32,
}

impl BitWriter {
    /// Create a new, empty bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the `count` lowest bits of `bits`, `count` being at most 32.
    #[inline]
    pub fn put(&mut self, bits: u32, count: u32) {
        debug_assert!(count <= 32);

        if count == 0 {
            return;
        }

        let bits = (bits & bit_mask(count)) as u64;
        self.cache |= bits << (64 - self.fill_level - count);
        self.fill_level += count;

        if self.fill_level >= 32 {
            self.drain();
        }
    }

    /// Append a run of zero bits of arbitrary length.
    pub fn put_zeroes(&mut self, mut count: u32) {
        while count > 0 {
            let step = count.min(32);
            self.put(0, step);
            count -= step;
        }
    }

    fn drain(&mut self) {
        let chunk = (self.cache >> 32) as u32;
        self.data.extend_from_slice(&chunk.to_be_bytes());
        self.cache <<= 32;
        self.fill_level -= 32;
    }

    /// The number of bits written so far.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8 + self.fill_level as usize
    }

    /// Pad the written bits with zeroes to the next byte boundary and return them.
    pub fn finish(mut self) -> Vec<u8> {
        let mut remaining = self.fill_level.div_ceil(8);

        while remaining > 0 {
            self.data.push((self.cache >> 56) as u8);
            self.cache <<= 8;
            remaining -= 1;
        }

        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reader_too_short() {
        assert!(BitReader::new(&[0x01, 0x02, 0x03]).is_none());
        assert!(BitReader::new(&[0x01, 0x02, 0x03, 0x04]).is_some());
    }

    #[test]
    fn bit_reader_16() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.get_bits(16).unwrap(), 0x0102);
        assert_eq!(reader.get_bits(16).unwrap(), 0x0304);
        assert_eq!(reader.get_bits(16).unwrap(), 0x0506);
    }

    #[test]
    fn bit_reader_12() {
        let data = [0b10011000, 0b00011111, 0b10101001, 0b11101001, 0b00011010];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.get_bits(12).unwrap(), 0b100110000001);
        assert_eq!(reader.get_bits(12).unwrap(), 0b111110101001);
        assert_eq!(reader.get_bits(12).unwrap(), 0b111010010001);
    }

    #[test]
    fn bit_reader_9() {
        let data = [0b10011000, 0b00011111, 0b10101001, 0b11101001, 0b00011010];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.get_bits(9).unwrap(), 0b100110000);
        assert_eq!(reader.get_bits(9).unwrap(), 0b001111110);
        assert_eq!(reader.get_bits(9).unwrap(), 0b101001111);
        assert_eq!(reader.get_bits(9).unwrap(), 0b010010001);
    }

    #[test]
    fn bit_reader_4() {
        let data = [0b10011000, 0b00011111, 0b10101001, 0b00000000];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.get_bits(4).unwrap(), 0b1001);
        assert_eq!(reader.get_bits(4).unwrap(), 0b1000);
        assert_eq!(reader.get_bits(4).unwrap(), 0b0001);
        assert_eq!(reader.get_bits(4).unwrap(), 0b1111);
        assert_eq!(reader.get_bits(4).unwrap(), 0b1010);
        assert_eq!(reader.get_bits(4).unwrap(), 0b1001);
    }

    #[test]
    fn bit_reader_peek_does_not_consume() {
        let data = [0xAB, 0xCD, 0xEF, 0x01];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.peek_bits(8).unwrap(), 0xAB);
        assert_eq!(reader.peek_bits(12).unwrap(), 0xABC);
        assert_eq!(reader.stream_position(), 0);
        assert_eq!(reader.get_bits(0).unwrap(), 0);
        assert_eq!(reader.get_bits(4).unwrap(), 0xA);
        assert_eq!(reader.stream_position(), 4);
    }

    #[test]
    fn bit_reader_no_fill_after_fill() {
        let data = [0xF0, 0x0F, 0xFF, 0x00, 0x12, 0x34, 0x56, 0x78];
        let mut reader = BitReader::new(&data).unwrap();
        reader.fill().unwrap();
        assert_eq!(reader.fill_level(), 32);
        assert_eq!(reader.get_bits_no_fill(4), 0xF);
        reader.skip_bits_no_fill(8);
        assert_eq!(reader.peek_bits_no_fill(20), 0xFFF00);
        reader.fill().unwrap();
        assert_eq!(reader.fill_level(), 52);
        assert_eq!(reader.get_bits_no_fill(32), 0xFFF00123);
        assert_eq!(reader.input_position(), 8);
    }

    #[test]
    fn bit_reader_zero_pads_then_fails() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BitReader::new(&data).unwrap();
        assert_eq!(reader.get_bits(32).unwrap(), 0xFFFFFFFF);
        assert_eq!(reader.get_bits(16).unwrap(), 0xFF00);
        assert!(reader.at_end());
        // Two refills of padding are tolerated.
        assert_eq!(reader.get_bits(16).unwrap(), 0);
        assert_eq!(reader.get_bits(32).unwrap(), 0);
        assert_eq!(reader.get_bits(32).unwrap(), 0);
        assert!(reader.get_bits(32).is_none());
    }

    #[test]
    fn bit_reader_skip() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00];
        let mut reader = BitReader::new(&data).unwrap();
        reader.skip_bytes(8).unwrap();
        assert_eq!(reader.get_bits(2).unwrap(), 0b11);
        assert!(reader.skip_bits(200).is_none());
    }

    #[test]
    fn bit_writer_16() {
        let mut writer = BitWriter::new();
        writer.put(0x0102, 16);
        writer.put(0x0304, 16);
        writer.put(0x0506, 16);

        assert_eq!(writer.finish(), [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn bit_writer_4() {
        let mut writer = BitWriter::new();
        writer.put(0b1001, 4);
        writer.put(0b1000, 4);
        writer.put(0b0001, 4);
        writer.put(0b1111, 4);
        writer.put(0b1010, 4);
        writer.put(0b1001, 4);

        assert_eq!(writer.finish(), [0b10011000, 0b00011111, 0b10101001]);
    }

    #[test]
    fn bit_writer_pads_last_byte() {
        let mut writer = BitWriter::new();
        writer.put(0b101, 3);
        writer.put_zeroes(40);
        writer.put(0b1, 1);
        assert_eq!(writer.bit_len(), 44);

        assert_eq!(writer.finish(), [0b10100000, 0, 0, 0, 0, 0b00010000]);
    }

    #[test]
    fn bit_writer_mixed_widths() {
        let widths = [1, 7, 13, 32, 3, 29, 16, 5];
        let values = [1, 0x55, 0x1ABC, 0xDEADBEEF, 0b110, 0x1234567, 0xFFFF, 0b10101];

        let mut writer = BitWriter::new();
        for (value, width) in values.iter().zip(widths) {
            writer.put(*value, width);
        }
        let data = writer.finish();

        let mut reader = BitReader::new(&data).unwrap();
        for (value, width) in values.iter().zip(widths) {
            assert_eq!(reader.get_bits(width).unwrap(), *value);
        }
    }
}
