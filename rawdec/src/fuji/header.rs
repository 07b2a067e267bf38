//! The header of a Fuji compressed payload.

use crate::error::{FormatError, Result, StreamError, bail};
use rawdec_common::byte::ByteReader;

/// The size of the header in bytes.
pub const HEADER_LEN: usize = 16;

/// The signature every header starts with.
pub const SIGNATURE: u16 = 0x4953;

/// The height of one line, in image rows.
pub(crate) const LINE_HEIGHT: usize = 6;

const MAX_DIMENSION: u16 = 0x3000;
const BLOCK_SIZE: u16 = 0x300;
const MAX_BLOCKS_IN_ROW: u8 = 0x10;
const MAX_LINES: u16 = 0x800;

/// The colour filter layout of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    /// A 2x2 Bayer layout.
    Bayer,
    /// A 6x6 X-Trans layout.
    XTrans,
}

/// The header of a Fuji compressed payload.
///
/// All fields are stored big-endian, in the order they are declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FujiHeader {
    /// The signature, always [`SIGNATURE`].
    pub signature: u16,
    /// The compression version, `1` for lossless and `0` for lossy.
    pub version: u8,
    /// The sensor layout, `16` for X-Trans and `0` for Bayer.
    pub raw_type: u8,
    /// The bit depth of the samples.
    pub raw_bits: u8,
    /// The height of the image.
    pub raw_height: u16,
    /// The width of the image, rounded up to a whole number of blocks.
    pub raw_rounded_width: u16,
    /// The width of the image.
    pub raw_width: u16,
    /// The width of a block.
    pub block_size: u16,
    /// The number of blocks per row, which is also the number of strips.
    pub blocks_in_row: u8,
    /// The number of lines.
    pub total_lines: u16,
}

impl FujiHeader {
    /// Read a header without validating it.
    pub fn read(reader: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            signature: reader.read_u16_be()?,
            version: reader.read_u8()?,
            raw_type: reader.read_u8()?,
            raw_bits: reader.read_u8()?,
            raw_height: reader.read_u16_be()?,
            raw_rounded_width: reader.read_u16_be()?,
            raw_width: reader.read_u16_be()?,
            block_size: reader.read_u16_be()?,
            blocks_in_row: reader.read_u8()?,
            total_lines: reader.read_u16_be()?,
        })
    }

    /// Read and validate a header.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let header = Self::read(reader).ok_or(StreamError::UnexpectedEof)?;
        header.validate()?;

        Ok(header)
    }

    /// Check that all fields are supported and consistent with each other.
    pub fn validate(&self) -> Result<()> {
        if self.signature != SIGNATURE {
            bail!(FormatError::InvalidSignature);
        }

        if self.version > 1 {
            bail!(FormatError::UnsupportedVersion);
        }

        if self.raw_type != 0 && self.raw_type != 16 {
            bail!(FormatError::UnsupportedRawType);
        }

        if !matches!(self.raw_bits, 12 | 14 | 16) {
            bail!(FormatError::UnsupportedBitDepth);
        }

        if self.block_size != BLOCK_SIZE {
            bail!(FormatError::InvalidBlockLayout);
        }

        let height = self.raw_height as usize;
        if self.raw_height > MAX_DIMENSION
            || height < LINE_HEIGHT
            || !height.is_multiple_of(LINE_HEIGHT)
        {
            bail!(FormatError::InvalidDimensions);
        }

        if self.raw_width > MAX_DIMENSION
            || self.raw_width < BLOCK_SIZE
            || !self.raw_width.is_multiple_of(24)
        {
            bail!(FormatError::InvalidDimensions);
        }

        let rounded_slack = self.raw_rounded_width.checked_sub(self.raw_width);
        if self.raw_rounded_width > MAX_DIMENSION
            || !self.raw_rounded_width.is_multiple_of(self.block_size)
            || rounded_slack.is_none_or(|slack| slack >= self.block_size)
        {
            bail!(FormatError::InvalidDimensions);
        }

        let blocks = self.blocks_in_row as u16;
        if self.blocks_in_row == 0
            || self.blocks_in_row > MAX_BLOCKS_IN_ROW
            || blocks != self.raw_rounded_width / self.block_size
            || blocks != self.raw_width.div_ceil(self.block_size)
        {
            bail!(FormatError::InvalidBlockLayout);
        }

        if self.total_lines == 0
            || self.total_lines > MAX_LINES
            || self.total_lines as usize != height / LINE_HEIGHT
        {
            bail!(FormatError::InvalidLineCount);
        }

        Ok(())
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0; HEADER_LEN];
        out[0..2].copy_from_slice(&self.signature.to_be_bytes());
        out[2] = self.version;
        out[3] = self.raw_type;
        out[4] = self.raw_bits;
        out[5..7].copy_from_slice(&self.raw_height.to_be_bytes());
        out[7..9].copy_from_slice(&self.raw_rounded_width.to_be_bytes());
        out[9..11].copy_from_slice(&self.raw_width.to_be_bytes());
        out[11..13].copy_from_slice(&self.block_size.to_be_bytes());
        out[13] = self.blocks_in_row;
        out[14..16].copy_from_slice(&self.total_lines.to_be_bytes());

        out
    }

    /// Whether the payload is losslessly compressed.
    pub fn is_lossless(&self) -> bool {
        self.version == 1
    }

    /// The sensor layout.
    pub fn sensor(&self) -> Sensor {
        if self.raw_type == 16 {
            Sensor::XTrans
        } else {
            Sensor::Bayer
        }
    }

    /// The largest representable sample value.
    pub fn max_value(&self) -> i32 {
        (1 << self.raw_bits) - 1
    }
}

impl Sensor {
    /// The size of the minimal coding unit, as `(width, height)`.
    pub fn mcu(&self) -> (usize, usize) {
        match self {
            Self::Bayer => (2, 2),
            Self::XTrans => (6, 6),
        }
    }

    /// The number of samples per line buffer for a block of the given width.
    pub(crate) fn line_width(&self, block_size: usize) -> usize {
        match self {
            Self::Bayer => block_size / 2,
            Self::XTrans => block_size * 2 / 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn header() -> FujiHeader {
        FujiHeader {
            signature: SIGNATURE,
            version: 1,
            raw_type: 16,
            raw_bits: 14,
            raw_height: 4176,
            raw_rounded_width: 6912,
            raw_width: 6384,
            block_size: 0x300,
            blocks_in_row: 9,
            total_lines: 696,
        }
    }

    fn assert_invalid(header: FujiHeader, error: FormatError) {
        assert_eq!(header.validate().unwrap_err(), DecodeError::Format(error));
    }

    #[test]
    fn parse_roundtrip() {
        let bytes = header().to_bytes();
        assert_eq!(&bytes[..5], &[0x49, 0x53, 1, 16, 14]);

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(FujiHeader::parse(&mut reader).unwrap(), header());
        assert!(reader.at_end());
        assert_eq!(header().sensor(), Sensor::XTrans);
        assert!(header().is_lossless());
        assert_eq!(header().max_value(), 16383);
    }

    #[test]
    fn truncated() {
        let bytes = header().to_bytes();
        let mut reader = ByteReader::new(&bytes[..15]);

        assert_eq!(
            FujiHeader::parse(&mut reader).unwrap_err(),
            DecodeError::Stream(StreamError::UnexpectedEof)
        );
    }

    #[test]
    fn invalid_fields() {
        let h = header();

        assert_invalid(FujiHeader { signature: 0x4954, ..h }, FormatError::InvalidSignature);
        assert_invalid(FujiHeader { version: 2, ..h }, FormatError::UnsupportedVersion);
        assert_invalid(FujiHeader { raw_type: 1, ..h }, FormatError::UnsupportedRawType);
        assert_invalid(FujiHeader { raw_bits: 10, ..h }, FormatError::UnsupportedBitDepth);
        assert_invalid(FujiHeader { block_size: 0x200, ..h }, FormatError::InvalidBlockLayout);
        assert_invalid(FujiHeader { raw_height: 4177, ..h }, FormatError::InvalidDimensions);
        assert_invalid(FujiHeader { raw_width: 6380, ..h }, FormatError::InvalidDimensions);
        assert_invalid(
            FujiHeader {
                raw_rounded_width: 6144,
                ..h
            },
            FormatError::InvalidDimensions,
        );
        assert_invalid(
            FujiHeader {
                raw_rounded_width: 7680,
                ..h
            },
            FormatError::InvalidDimensions,
        );
        assert_invalid(FujiHeader { blocks_in_row: 8, ..h }, FormatError::InvalidBlockLayout);
        assert_invalid(FujiHeader { total_lines: 695, ..h }, FormatError::InvalidLineCount);
        assert_invalid(FujiHeader { total_lines: 0, ..h }, FormatError::InvalidLineCount);
    }

    #[test]
    fn bayer_geometry() {
        let h = FujiHeader {
            raw_type: 0,
            ..header()
        };

        assert_eq!(h.sensor(), Sensor::Bayer);
        assert_eq!(h.sensor().mcu(), (2, 2));
        assert_eq!(h.sensor().line_width(0x300), 384);
        assert_eq!(Sensor::XTrans.line_width(0x300), 512);
    }
}
