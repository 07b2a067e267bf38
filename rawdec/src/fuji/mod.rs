//! Decompression of Fuji compressed RAF payloads.
//!
//! The image is split into vertical strips of `block_size` columns, each coded
//! independently with its own byte range and gradient contexts. A strip is decoded in
//! lines of six rows: every line is split into its colour planes, which are predicted
//! from the two previous lines of the same plane and refined by adaptively coded
//! differences. Both lossless and lossy payloads, as well as Bayer and X-Trans sensors,
//! are supported.
//!
//! Strips can be decoded in parallel: [`FujiDecompressor::strips`] splits the payload
//! and [`FujiDecompressor::strip_outputs`] splits the destination into disjoint views,
//! after which every pair can be handed to [`FujiDecompressor::decode_strip`] on a
//! separate thread.

mod block;
mod header;
mod params;

pub use header::{FujiHeader, HEADER_LEN, SIGNATURE, Sensor};

use crate::error::{FormatError, GeometryError, Result, StreamError, bail};
use crate::fuji::block::BlockDecoder;
use crate::fuji::header::LINE_HEIGHT;
use crate::fuji::params::FujiParams;
use crate::log::{ldebug, ltrace, lwarn};
use crate::math::round_up;
use rawdec_common::array2d::Array2DMut;
use rawdec_common::byte::ByteReader;
use smallvec::SmallVec;

/// The colour of a filter element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaColor {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
}

use CfaColor::{Blue as B, Green as G, Red as R};

/// The standard X-Trans layout.
pub const XTRANS_CFA: [[CfaColor; 6]; 6] = [
    [G, G, R, G, G, B],
    [G, G, B, G, G, R],
    [B, R, G, R, B, G],
    [G, G, B, G, G, R],
    [G, G, R, G, G, B],
    [R, B, G, B, R, G],
];

/// The standard RGGB Bayer layout, repeated to 6x6.
pub const RGGB_CFA: [[CfaColor; 6]; 6] = [
    [R, G, R, G, R, G],
    [G, B, G, B, G, B],
    [R, G, R, G, R, G],
    [G, B, G, B, G, B],
    [R, G, R, G, R, G],
    [G, B, G, B, G, B],
];

/// The compressed data of a single strip.
#[derive(Debug, Clone, Copy)]
pub struct FujiStrip<'a> {
    /// The index of the strip, counting from the left.
    pub n: usize,
    /// The coded bits.
    pub data: &'a [u8],
    /// The quantization step of every line, for lossy payloads.
    pub q_bases: Option<&'a [u8]>,
}

/// The part of the destination buffer that a single strip writes to.
#[derive(Debug)]
pub struct StripOutput<'a> {
    rows: Vec<&'a mut [u16]>,
}

/// A decompressor for Fuji compressed images.
#[derive(Debug, Clone)]
pub struct FujiDecompressor {
    header: FujiHeader,
    cfa: [[CfaColor; 6]; 6],
    params: FujiParams,
}

impl FujiDecompressor {
    /// Create a new decompressor for the given header and colour filter layout.
    pub fn new(header: FujiHeader, cfa: [[CfaColor; 6]; 6]) -> Result<Self> {
        header.validate()?;

        let decompressor = Self {
            header,
            cfa,
            params: FujiParams::new(&header),
        };

        let (mcu_width, _) = header.sensor().mcu();
        for n in 0..decompressor.strip_count() {
            if !decompressor.strip_width(n).is_multiple_of(mcu_width) {
                bail!(GeometryError::InvalidBlockWidth);
            }
        }

        ldebug!(
            "fuji: {}x{}, {:?}, {} bits, {}, {} strips of {} lines",
            header.raw_width,
            header.raw_height,
            header.sensor(),
            header.raw_bits,
            if header.is_lossless() {
                "lossless"
            } else {
                "lossy"
            },
            header.blocks_in_row,
            header.total_lines
        );

        Ok(decompressor)
    }

    /// Create a new decompressor from the header at the start of `input`.
    pub fn from_payload(input: &[u8], cfa: [[CfaColor; 6]; 6]) -> Result<Self> {
        let header = FujiHeader::parse(&mut ByteReader::new(input))?;

        Self::new(header, cfa)
    }

    /// The header of the payload.
    pub fn header(&self) -> &FujiHeader {
        &self.header
    }

    /// The width of the image.
    pub fn width(&self) -> usize {
        self.header.raw_width as usize
    }

    /// The height of the image.
    pub fn height(&self) -> usize {
        self.header.raw_height as usize
    }

    /// The number of strips.
    pub fn strip_count(&self) -> usize {
        self.header.blocks_in_row as usize
    }

    /// The number of columns covered by strip `n`.
    fn strip_width(&self, n: usize) -> usize {
        let block_size = self.header.block_size as usize;
        let offset = n * block_size;

        if n + 1 == self.strip_count() {
            self.width() - offset
        } else {
            block_size
        }
    }

    /// Split a payload, starting with its header, into its strips.
    pub fn strips<'a>(&self, input: &'a [u8]) -> Result<SmallVec<[FujiStrip<'a>; 16]>> {
        let mut reader = ByteReader::new(input);
        reader
            .skip_bytes(HEADER_LEN)
            .ok_or(StreamError::UnexpectedEof)?;

        let count = self.strip_count();
        let mut sizes = SmallVec::<[usize; 16]>::new();

        for _ in 0..count {
            let size = reader.read_u32_be().ok_or(StreamError::UnexpectedEof)?;
            sizes.push(size as usize);
        }

        let size_table_len = 4 * count;
        reader
            .skip_bytes(round_up(size_table_len, 16) - size_table_len)
            .ok_or(StreamError::UnexpectedEof)?;

        let q_bases = if self.header.is_lossless() {
            None
        } else {
            let per_strip = round_up(self.header.total_lines as usize, 16);
            let q_bases = reader
                .read_bytes(count * per_strip)
                .ok_or(StreamError::UnexpectedEof)?;

            Some((q_bases, per_strip))
        };

        let mut strips = SmallVec::new();

        for (n, size) in sizes.into_iter().enumerate() {
            if size < 4 {
                bail!(FormatError::InvalidStripSize);
            }

            let data = reader
                .read_bytes(size)
                .ok_or(FormatError::InvalidStripSize)?;

            strips.push(FujiStrip {
                n,
                data,
                q_bases: q_bases.map(|(q, per_strip)| &q[n * per_strip..(n + 1) * per_strip]),
            });
        }

        if reader.remaining() > 16 {
            lwarn!(
                "fuji: {} trailing bytes after the last strip",
                reader.remaining()
            );
        }

        Ok(strips)
    }

    /// Split the destination into the disjoint regions written by each strip.
    ///
    /// The destination must have the dimensions of the image.
    pub fn strip_outputs<'a>(
        &self,
        out: &'a mut Array2DMut<'_, u16>,
    ) -> Result<Vec<StripOutput<'a>>> {
        if out.width() != self.width() || out.height() != self.height() {
            bail!(GeometryError::DestinationMismatch);
        }

        let mut outputs: Vec<_> = (0..self.strip_count())
            .map(|_| StripOutput {
                rows: Vec::with_capacity(self.height()),
            })
            .collect();

        for row in out.rows_mut() {
            let mut rest = row;

            for (n, output) in outputs.iter_mut().enumerate() {
                let (head, tail) = core::mem::take(&mut rest).split_at_mut(self.strip_width(n));
                output.rows.push(head);
                rest = tail;
            }
        }

        Ok(outputs)
    }

    /// Decode a single strip into its output region.
    ///
    /// Strips don't share any state, so different strips may be decoded concurrently.
    pub fn decode_strip(&self, strip: &FujiStrip<'_>, out: &mut StripOutput<'_>) -> Result<()> {
        let width = self.strip_width(strip.n);

        if out.rows.len() != self.height() || out.rows.iter().any(|row| row.len() != width) {
            bail!(GeometryError::DestinationMismatch);
        }

        ltrace!(
            "fuji: decoding strip {} ({} bytes, {} columns)",
            strip.n,
            strip.data.len(),
            width
        );

        let mut decoder = BlockDecoder::new(&self.params, self.header.sensor(), strip.data)?;
        let total_lines = self.header.total_lines as usize;
        debug_assert_eq!(total_lines * LINE_HEIGHT, self.height());

        for line in 0..total_lines {
            if let Some(q_bases) = strip.q_bases {
                let q_base = q_bases
                    .get(line)
                    .copied()
                    .ok_or(StreamError::UnexpectedEof)?;
                decoder.set_q_base(q_base, line == 0);
            }

            decoder.decode_block()?;
            decoder.rotate_lines();
            decoder.copy_to(out, line, &self.cfa);
            decoder.reset_lines();
        }

        Ok(())
    }

    /// Decompress a payload, starting with its header, into `out`.
    ///
    /// Strips are decoded one after the other.
    pub fn decompress(&self, input: &[u8], out: &mut Array2DMut<'_, u16>) -> Result<()> {
        let strips = self.strips(input)?;
        let mut outputs = self.strip_outputs(out)?;

        for (strip, output) in strips.iter().zip(outputs.iter_mut()) {
            self.decode_strip(strip, output)?;
        }

        Ok(())
    }
}
