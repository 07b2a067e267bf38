//! Decompression of Olympus ORF payloads.
//!
//! Every sample is coded as the difference to a spatial prediction. The number of bits
//! used for a difference adapts to the magnitudes seen before, tracked in two carry
//! states that alternate by column parity and are reset at the start of every row.
//! Decoding is strictly sequential.

use crate::error::{GeometryError, Result, StreamError, bail};
use crate::log::ldebug;
use crate::lut::{HIGH_NOT_FOUND, SimpleLut, high_bit_table};
use crate::math::{clamp_bits, num_active_bits};
use rawdec_common::array2d::Array2DMut;
use rawdec_common::bit::BitReader;
use rawdec_common::byte::ByteReader;

/// The largest supported image width.
pub const MAX_WIDTH: usize = 10400;
/// The largest supported image height.
pub const MAX_HEIGHT: usize = 7792;

/// The size of the sub-header preceding the bit stream.
const HEADER_LEN: usize = 7;

/// The adaptive state of one column parity.
#[derive(Debug, Default, Clone, Copy)]
struct Carry {
    /// The magnitude of the last symbol.
    magnitude: i32,
    /// A smoothed bias added to every difference.
    bias: i32,
    /// How many symbols in a row had a small magnitude.
    stale: i32,
}

/// A decompressor for Olympus ORF images.
#[derive(Debug, Clone)]
pub struct OlympusDecompressor {
    width: usize,
    height: usize,
    bittable: SimpleLut<u8, 12>,
}

impl OlympusDecompressor {
    /// Create a new decompressor for an image with the given dimensions.
    ///
    /// Both dimensions must be non-zero and even, and may not exceed
    /// [`MAX_WIDTH`] x [`MAX_HEIGHT`].
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            bail!(GeometryError::InvalidDimensions);
        }

        if width > MAX_WIDTH || height > MAX_HEIGHT {
            bail!(GeometryError::ImageTooLarge);
        }

        ldebug!("olympus: {width}x{height}");

        Ok(Self {
            width,
            height,
            bittable: high_bit_table(),
        })
    }

    /// The width of the image.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Decompress `input` into `out`, which must have the dimensions of the image.
    pub fn decompress(&self, input: &[u8], out: &mut Array2DMut<'_, u16>) -> Result<()> {
        if out.width() != self.width || out.height() != self.height {
            bail!(GeometryError::DestinationMismatch);
        }

        let mut reader = ByteReader::new(input);
        reader
            .skip_bytes(HEADER_LEN)
            .ok_or(StreamError::UnexpectedEof)?;
        let mut bits = BitReader::new(reader.tail()).ok_or(StreamError::UnexpectedEof)?;

        for row in 0..self.height {
            self.decompress_row(&mut bits, out, row)?;
        }

        Ok(())
    }

    fn decompress_row(
        &self,
        bits: &mut BitReader<'_>,
        out: &mut Array2DMut<'_, u16>,
        row: usize,
    ) -> Result<()> {
        let mut carries = [Carry::default(); 2];

        for group in 0..self.width / 2 {
            for (c, carry) in carries.iter_mut().enumerate() {
                let col = 2 * group + c;

                let diff = self.parse_carry(bits, carry)?;
                let pred = predict(out, row, col);

                out[(row, col)] = clamp_bits(pred + diff, 16);
            }
        }

        Ok(())
    }

    /// Decode the next difference and update the carry state.
    #[inline(always)]
    fn parse_carry(&self, bits: &mut BitReader<'_>, carry: &mut Carry) -> Result<i32> {
        bits.fill().ok_or(StreamError::UnexpectedEof)?;

        let nbits_bias = if carry.stale < 3 { 2 } else { 0 };
        // Only the low 16 bits of the magnitude take part in the width estimate.
        let nbits = (num_active_bits(carry.magnitude as u16) as i32 - nbits_bias)
            .max(2 + nbits_bias) as u32;
        debug_assert!((2..=14).contains(&nbits));

        let b = bits.peek_bits_no_fill(15);
        let sign = -((b >> 14) as i32);
        let low = ((b >> 12) & 3) as i32;
        let mut high = self.bittable[(b & 4095) as usize] as u32;

        // At most 31 bits are consumed below, all of which are covered by the fill.
        if high == HIGH_NOT_FOUND as u32 {
            bits.skip_bits_no_fill(15);
            high = bits.get_bits_no_fill(16 - nbits) >> 1;
        } else {
            bits.skip_bits_no_fill(high + 1 + 3);
        }

        carry.magnitude = ((high << nbits) | bits.get_bits_no_fill(nbits)) as i32;
        let diff = (carry.magnitude ^ sign) + carry.bias;
        carry.bias = (diff * 3 + carry.bias) >> 5;
        carry.stale = if carry.magnitude > 16 {
            0
        } else {
            carry.stale + 1
        };

        Ok((diff * 4) | low)
    }
}

/// Predict a sample from its neighbours two columns and two rows back.
#[inline(always)]
fn predict(out: &Array2DMut<'_, u16>, row: usize, col: usize) -> i32 {
    let left = || out[(row, col - 2)] as i32;
    let up = || out[(row - 2, col)] as i32;

    match (row < 2, col < 2) {
        (true, true) => 0,
        (true, false) => left(),
        (false, true) => up(),
        (false, false) => {
            let left = left();
            let up = up();
            let left_up = out[(row - 2, col - 2)] as i32;

            let left_minus_nw = left - left_up;
            let up_minus_nw = up - left_up;

            // Gradients of opposite signs.
            if (left_minus_nw < 0) != (up_minus_nw < 0) && left_minus_nw != 0 && up_minus_nw != 0
            {
                if left_minus_nw.abs() > 32 || up_minus_nw.abs() > 32 {
                    left + up_minus_nw
                } else {
                    (left + up) >> 1
                }
            } else if left_minus_nw.abs() > up_minus_nw.abs() {
                left
            } else {
                up
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use rawdec_common::bit::BitWriter;

    #[test]
    fn dimension_limits() {
        assert!(OlympusDecompressor::new(MAX_WIDTH, MAX_HEIGHT).is_ok());
        assert!(OlympusDecompressor::new(2, 2).is_ok());

        let invalid = [(0, 2), (2, 0), (3, 2), (2, 3), (MAX_WIDTH - 1, 2)];
        for (w, h) in invalid {
            assert_eq!(
                OlympusDecompressor::new(w, h).unwrap_err(),
                DecodeError::Geometry(GeometryError::InvalidDimensions)
            );
        }

        let too_large = [(MAX_WIDTH + 2, 2), (2, MAX_HEIGHT + 2)];
        for (w, h) in too_large {
            assert_eq!(
                OlympusDecompressor::new(w, h).unwrap_err(),
                DecodeError::Geometry(GeometryError::ImageTooLarge)
            );
        }
    }

    #[test]
    fn destination_mismatch() {
        let decompressor = OlympusDecompressor::new(4, 2).unwrap();
        let mut buf = [0_u16; 16];
        let mut out = Array2DMut::new_packed(&mut buf, 8, 2).unwrap();

        assert_eq!(
            decompressor.decompress(&[0; 64], &mut out).unwrap_err(),
            DecodeError::Geometry(GeometryError::DestinationMismatch)
        );
    }

    #[test]
    fn prediction_at_borders() {
        let mut buf: Vec<u16> = (0..16).map(|i| 100 + i * 10).collect();
        let out = Array2DMut::new_packed(&mut buf, 4, 4).unwrap();

        assert_eq!(predict(&out, 0, 0), 0);
        assert_eq!(predict(&out, 1, 1), 0);
        assert_eq!(predict(&out, 0, 3), 110);
        assert_eq!(predict(&out, 3, 1), 150);
    }

    #[test]
    fn prediction_with_gradients() {
        let grid = |left_up: u16, up: u16, left: u16| {
            let mut buf = vec![0_u16; 9];
            buf[0] = left_up;
            buf[2] = up;
            buf[6] = left;
            buf
        };

        // Same signs: the neighbour with the larger gradient wins.
        let mut buf = grid(100, 110, 150);
        let out = Array2DMut::new_packed(&mut buf, 3, 3).unwrap();
        assert_eq!(predict(&out, 2, 2), 150);

        let mut buf = grid(100, 110, 105);
        let out = Array2DMut::new_packed(&mut buf, 3, 3).unwrap();
        assert_eq!(predict(&out, 2, 2), 110);

        // Small opposite gradients average.
        let mut buf = grid(100, 120, 90);
        let out = Array2DMut::new_packed(&mut buf, 3, 3).unwrap();
        assert_eq!(predict(&out, 2, 2), 105);

        // Large opposite gradients extrapolate.
        let mut buf = grid(100, 200, 90);
        let out = Array2DMut::new_packed(&mut buf, 3, 3).unwrap();
        assert_eq!(predict(&out, 2, 2), 190);

        // A zero gradient never averages.
        let mut buf = grid(100, 100, 60);
        let out = Array2DMut::new_packed(&mut buf, 3, 3).unwrap();
        assert_eq!(predict(&out, 2, 2), 60);
    }

    #[test]
    fn carry_evolution() {
        let decompressor = OlympusDecompressor::new(2, 2).unwrap();

        let mut writer = BitWriter::new();
        // Direct code: high = 5, four extra bits.
        writer.put(0b0_01_000001_0011, 13);
        // Negative direct code with five extra bits.
        writer.put(0b1_10_01_00100, 10);
        // Escape code: a literal high value follows the empty 12-bit window.
        writer.put(0b0_11_000000000000, 15);
        writer.put(12, 12);
        writer.put(0b1111, 4);
        writer.put_zeroes(32);
        let data = writer.finish();

        let mut bits = BitReader::new(&data).unwrap();
        let mut carry = Carry::default();

        assert_eq!(decompressor.parse_carry(&mut bits, &mut carry).unwrap(), 333);
        assert_eq!((carry.magnitude, carry.bias, carry.stale), (83, 7, 0));

        assert_eq!(decompressor.parse_carry(&mut bits, &mut carry).unwrap(), -118);
        assert_eq!((carry.magnitude, carry.bias, carry.stale), (36, -3, 0));

        // nbits = 4, high = 12 >> 1.
        assert_eq!(decompressor.parse_carry(&mut bits, &mut carry).unwrap(), 435);
        assert_eq!((carry.magnitude, carry.bias, carry.stale), (111, 10, 0));
        assert_eq!(bits.stream_position(), 13 + 10 + 31);
    }
}
