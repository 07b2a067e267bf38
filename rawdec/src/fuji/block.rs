//! Decoding of a single strip, one line of six rows at a time.
//!
//! Every colour plane of a line is decoded into a set of line buffers. Each buffer has
//! one border sample on either side, replicated from the line above, so the predictors
//! never have to special-case the edges of a block. The two most recent lines of every
//! plane are kept around as context for the next line.

use crate::alloc::AlignedVec;
use crate::error::{DecodingError, Result, StreamError, bail};
use crate::fuji::header::{LINE_HEIGHT, Sensor};
use crate::fuji::params::{FujiParams, QTable};
use crate::fuji::{CfaColor, StripOutput};
use rawdec_common::bit::BitReader;

const R0: usize = 0;
const R1: usize = 1;
const R2: usize = 2;
const R3: usize = 3;
const R4: usize = 4;
const G0: usize = 5;
const G1: usize = 6;
const G2: usize = 7;
const G3: usize = 8;
const G4: usize = 9;
const G5: usize = 10;
const G6: usize = 11;
const G7: usize = 12;
const B0: usize = 13;
const B1: usize = 14;
const B2: usize = 15;
const B3: usize = 16;
const B4: usize = 17;
const LINE_COUNT: usize = 18;

/// The number of gradient contexts of the main table.
const MAIN_GRADIENTS: usize = 41;
/// The number of gradient contexts of a fixed table.
const FIXED_GRADIENTS: usize = 5;
/// The number of fixed tables.
const FIXED_TABLES: usize = 3;

/// The running statistics of one gradient context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Gradient {
    /// The sum of recent code magnitudes.
    sum: i32,
    /// The number of codes that contributed to `sum`.
    count: i32,
}

impl Gradient {
    fn new(sum: i32) -> Self {
        Self { sum, count: 1 }
    }
}

#[derive(Debug, Clone)]
struct GradientSet {
    main: [Gradient; MAIN_GRADIENTS],
    fixed: [[Gradient; FIXED_GRADIENTS]; FIXED_TABLES],
}

impl GradientSet {
    fn new(params: &FujiParams) -> Self {
        let mut fixed = [[Gradient::default(); FIXED_GRADIENTS]; FIXED_TABLES];

        for (gradients, table) in fixed.iter_mut().zip(&params.fixed) {
            *gradients = [Gradient::new(table.initial_gradient()); FIXED_GRADIENTS];
        }

        Self {
            main: [Gradient::new(params.main.initial_gradient()); MAIN_GRADIENTS],
            fixed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Parity {
    Even = 0,
    Odd = 1,
}

/// The positions of the next even and odd sample of a plane within its line.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    even: usize,
    odd: usize,
}

impl Cursor {
    const START: Self = Self { even: 0, odd: 1 };
}

/// A pass decodes one line of two colour planes, interleaving even and odd samples.
struct Pass {
    lines: [(CfaColor, usize); 2],
    grad_set: usize,
}

const PASSES: [Pass; 6] = [
    Pass {
        lines: [(CfaColor::Red, R2), (CfaColor::Green, G2)],
        grad_set: 0,
    },
    Pass {
        lines: [(CfaColor::Green, G3), (CfaColor::Blue, B2)],
        grad_set: 1,
    },
    Pass {
        lines: [(CfaColor::Red, R3), (CfaColor::Green, G4)],
        grad_set: 2,
    },
    Pass {
        lines: [(CfaColor::Green, G5), (CfaColor::Blue, B3)],
        grad_set: 0,
    },
    Pass {
        lines: [(CfaColor::Red, R4), (CfaColor::Green, G6)],
        grad_set: 1,
    },
    Pass {
        lines: [(CfaColor::Green, G7), (CfaColor::Blue, B4)],
        grad_set: 2,
    },
];

/// The lines of each colour plane that are decoded in a block.
fn decoded_lines(color: CfaColor) -> (usize, usize) {
    match color {
        CfaColor::Red => (R2, R4),
        CfaColor::Green => (G2, G7),
        CfaColor::Blue => (B2, B4),
    }
}

/// Whether the even samples of the two planes of a pass are coded in the stream, as
/// opposed to being interpolated from the line above.
fn codes_even_samples(sensor: Sensor, pass: usize, pos: usize) -> (bool, bool) {
    match (sensor, pass) {
        (Sensor::Bayer, _) => (true, true),
        (Sensor::XTrans, 0) => (false, true),
        (Sensor::XTrans, 1) => (true, false),
        (Sensor::XTrans, 2) => (pos & 3 != 0, false),
        (Sensor::XTrans, 3) => (true, pos & 3 != 2),
        (Sensor::XTrans, 4) => (pos & 3 != 2, true),
        (Sensor::XTrans, _) => (false, pos & 3 != 0),
    }
}

/// The line buffers of all colour planes, stored back-to-back.
struct LineBuffers {
    data: AlignedVec<u16>,
    line_width: usize,
    stride: usize,
}

impl LineBuffers {
    fn new(line_width: usize) -> Result<Self> {
        let stride = line_width + 2;

        Ok(Self {
            data: AlignedVec::zeroed(LINE_COUNT * stride)?,
            line_width,
            stride,
        })
    }

    /// The sample at position `pos` of `line`, `0` being the left border.
    #[inline(always)]
    fn get(&self, line: usize, pos: usize) -> i32 {
        self.data[line * self.stride + pos] as i32
    }

    fn copy_line(&mut self, dst: usize, src: usize) {
        let start = src * self.stride;
        self.data
            .copy_within(start..start + self.stride, dst * self.stride);
    }

    /// Replicate the borders of `first..=last` from the respective line above.
    fn extend(&mut self, first: usize, last: usize) {
        let (s, w) = (self.stride, self.line_width);

        for line in first..=last {
            self.data[line * s] = self.data[(line - 1) * s + 1];
            self.data[line * s + w + 1] = self.data[(line - 1) * s + w];
        }
    }

    fn clear(&mut self, first: usize, count: usize) {
        self.data[first * self.stride..(first + count) * self.stride].fill(0);
        self.extend(first, first);
    }
}

/// The decoding state of one strip.
pub(crate) struct BlockDecoder<'a> {
    params: FujiParams,
    sensor: Sensor,
    bits: BitReader<'a>,
    lines: LineBuffers,
    /// Gradient sets by parity and set index.
    gradients: [[GradientSet; 3]; 2],
}

impl<'a> BlockDecoder<'a> {
    pub(crate) fn new(params: &FujiParams, sensor: Sensor, data: &'a [u8]) -> Result<Self> {
        let bits = BitReader::new(data).ok_or(StreamError::UnexpectedEof)?;
        let lines = LineBuffers::new(params.line_width)?;
        let set = GradientSet::new(params);

        Ok(Self {
            params: params.clone(),
            sensor,
            bits,
            lines,
            gradients: core::array::from_fn(|_| core::array::from_fn(|_| set.clone())),
        })
    }

    /// Switch the main table to a new quantization step, resetting its gradients.
    ///
    /// Only used in lossy mode, where every line can have its own step.
    pub(crate) fn set_q_base(&mut self, q_base: u8, first_line: bool) {
        let q_base = q_base as i32;

        if !first_line && q_base == self.params.main.q_base {
            return;
        }

        self.params.main = QTable::main(self.params.max_value, q_base);
        let initial = Gradient::new(self.params.main.initial_gradient());

        for set in self.gradients.iter_mut().flatten() {
            set.main = [initial; MAIN_GRADIENTS];
        }
    }

    /// Decode all colour planes of the next line.
    pub(crate) fn decode_block(&mut self) -> Result<()> {
        let lw = self.params.line_width;

        for (i, pass) in PASSES.iter().enumerate() {
            let [(c0, l0), (c1, l1)] = pass.lines;
            let mut p0 = Cursor::START;
            let mut p1 = Cursor::START;

            while p0.even < lw || p0.odd < lw {
                if p0.even < lw {
                    let (code0, code1) = codes_even_samples(self.sensor, i, p0.even);
                    self.decode_even(l0, &mut p0.even, code0, pass.grad_set)?;
                    self.decode_even(l1, &mut p1.even, code1, pass.grad_set)?;
                }

                if p0.even > 8 {
                    self.decode_sample_odd(l0, &mut p0.odd, pass.grad_set)?;
                    self.decode_sample_odd(l1, &mut p1.odd, pass.grad_set)?;
                }
            }

            for color in [c0, c1] {
                let (first, last) = decoded_lines(color);
                self.lines.extend(first, last);
            }
        }

        Ok(())
    }

    /// Keep the last two lines of every plane as context for the next line.
    pub(crate) fn rotate_lines(&mut self) {
        for (dst, src) in [(R0, R3), (R1, R4), (G0, G6), (G1, G7), (B0, B3), (B1, B4)] {
            self.lines.copy_line(dst, src);
        }
    }

    /// Clear the decoded lines in preparation for the next line.
    pub(crate) fn reset_lines(&mut self) {
        self.lines.clear(R2, 3);
        self.lines.clear(G2, 6);
        self.lines.clear(B2, 3);
    }

    /// Route the decoded planes of `line` into the output rows of the strip.
    pub(crate) fn copy_to(&self, out: &mut StripOutput<'_>, line: usize, cfa: &[[CfaColor; 6]; 6]) {
        for (row, cfa_row) in cfa.iter().enumerate() {
            let Some(out_row) = out.rows.get_mut(line * LINE_HEIGHT + row) else {
                return;
            };

            for (px, value) in out_row.iter_mut().enumerate() {
                let plane = match cfa_row[px % 6] {
                    CfaColor::Red => R2 + row / 2,
                    CfaColor::Green => G2 + row,
                    CfaColor::Blue => B2 + row / 2,
                };

                let idx = match self.sensor {
                    Sensor::Bayer => px >> 1,
                    Sensor::XTrans => {
                        (((px * 2 / 3) & !1) | ((px % 3) & 1)) + ((px % 3) >> 1)
                    }
                };

                *value = self.lines.get(plane, 1 + idx) as u16;
            }
        }
    }

    fn decode_even(
        &mut self,
        line: usize,
        pos: &mut usize,
        coded: bool,
        grad_set: usize,
    ) -> Result<()> {
        if coded {
            self.decode_sample_even(line, *pos, grad_set)?;
        } else {
            self.interpolate_even(line, *pos);
        }

        *pos += 2;

        Ok(())
    }

    /// The neighbours `(rb, rc, rd, rf)` of an even sample: above, above left, above
    /// right and two lines above.
    #[inline(always)]
    fn even_neighbours(&self, line: usize, pos: usize) -> (i32, i32, i32, i32) {
        let p = 1 + pos;

        (
            self.lines.get(line - 1, p),
            self.lines.get(line - 1, p - 1),
            self.lines.get(line - 1, p + 1),
            self.lines.get(line - 2, p),
        )
    }

    #[inline(always)]
    fn even_prediction(rb: i32, rc: i32, rd: i32, rf: i32) -> i32 {
        let diff_rc_rb = (rc - rb).abs();
        let diff_rf_rb = (rf - rb).abs();
        let diff_rd_rb = (rd - rb).abs();

        let sum = if diff_rc_rb > diff_rf_rb && diff_rc_rb > diff_rd_rb {
            rf + rd + 2 * rb
        } else if diff_rd_rb > diff_rc_rb && diff_rd_rb > diff_rf_rb {
            rf + rc + 2 * rb
        } else {
            rd + rc + 2 * rb
        };

        sum >> 2
    }

    fn interpolate_even(&mut self, line: usize, pos: usize) {
        let (rb, rc, rd, rf) = self.even_neighbours(line, pos);
        let value = Self::even_prediction(rb, rc, rd, rf);
        self.store(line, pos, value);
    }

    fn decode_sample_even(&mut self, line: usize, pos: usize, grad_set: usize) -> Result<()> {
        let (rb, rc, rd, rf) = self.even_neighbours(line, pos);
        let diff_sum = (rf - rb).abs() + (rc - rb).abs();
        let interp = Self::even_prediction(rb, rc, rd, rf);

        let value = self.decode_value(Parity::Even, grad_set, diff_sum, rb - rf, rc - rb, interp)?;
        self.store(line, pos, value);

        Ok(())
    }

    fn decode_sample_odd(&mut self, line: usize, pos: &mut usize, grad_set: usize) -> Result<()> {
        let p = 1 + *pos;
        let ra = self.lines.get(line, p - 1);
        let rg = self.lines.get(line, p + 1);
        let rb = self.lines.get(line - 1, p);
        let rc = self.lines.get(line - 1, p - 1);
        let rd = self.lines.get(line - 1, p + 1);

        let diff_sum = (rb - rc).abs() + (rc - ra).abs();
        let interp = if (rb > rc && rb > rd) || (rb < rc && rb < rd) {
            (rg + ra + 2 * rb) >> 2
        } else {
            (ra + rg) >> 1
        };

        let value = self.decode_value(Parity::Odd, grad_set, diff_sum, rb - rc, rc - ra, interp)?;
        self.store(line, *pos, value);
        *pos += 2;

        Ok(())
    }

    /// Decode the next code and apply it to the prediction `interp`.
    #[inline(always)]
    fn decode_value(
        &mut self,
        parity: Parity,
        grad_set: usize,
        diff_sum: i32,
        d1: i32,
        d2: i32,
        interp: i32,
    ) -> Result<i32> {
        let set = &mut self.gradients[parity as usize][grad_set];
        let (table, gradients) = match self.params.select_fixed(diff_sum) {
            Some(i) => (&self.params.fixed[i], &mut set.fixed[i][..]),
            None => (&self.params.main, &mut set.main[..]),
        };

        let max_value = self.params.max_value;
        let grad = table.gradient(max_value, d1, d2);
        let gradient = &mut gradients[grad.unsigned_abs() as usize];

        let code = read_code(
            &mut self.bits,
            table,
            self.params.max_bits,
            self.params.min_value,
            gradient,
        )?;

        let step = 2 * table.q_base + 1;
        let mut value = if grad < 0 {
            interp - code * step
        } else {
            interp + code * step
        };

        if value < -table.q_base {
            value += table.total_values * step;
        } else if value > table.q_base + max_value {
            value -= table.total_values * step;
        }

        Ok(value.clamp(0, max_value))
    }

    #[inline(always)]
    fn store(&mut self, line: usize, pos: usize, value: i32) {
        debug_assert!((0..=self.params.max_value).contains(&value));

        self.lines.data[line * self.lines.stride + 1 + pos] = value as u16;
    }
}

/// Count the zero bits up to the next set bit, consuming all of them.
fn zerobits(bits: &mut BitReader<'_>) -> Result<i32> {
    let mut count = 0_i32;

    loop {
        let batch = bits.peek_bits(31).ok_or(StreamError::UnexpectedEof)?;

        if batch == 0 {
            bits.skip_bits_no_fill(31);
            count = count.saturating_add(31);
            continue;
        }

        // The batch is 31 bits wide, so the top bit is always clear.
        let zeros = batch.leading_zeros() - 1;
        bits.skip_bits_no_fill(zeros + 1);

        return Ok(count.saturating_add(zeros as i32));
    }
}

/// The number of bits needed so that `value2 << bits` reaches `value1`, at most 15.
fn bit_diff(value1: i32, value2: i32) -> u32 {
    if value2 >= value1 {
        return 0;
    }

    let mut bits = 1;
    while bits < 15 && (value2 << bits) < value1 {
        bits += 1;
    }

    bits
}

/// Read a code and update the statistics of its gradient context.
#[inline(always)]
fn read_code(
    bits: &mut BitReader<'_>,
    table: &QTable,
    max_bits: i32,
    min_value: i32,
    gradient: &mut Gradient,
) -> Result<i32> {
    let sample = zerobits(bits)?;

    let code = if sample < max_bits - table.raw_bits as i32 - 1 {
        let dec_bits = bit_diff(gradient.sum, gradient.count);
        let extra = bits.get_bits(dec_bits).ok_or(StreamError::UnexpectedEof)?;
        (sample << dec_bits) + extra as i32
    } else {
        let extra = bits
            .get_bits(table.raw_bits)
            .ok_or(StreamError::UnexpectedEof)?;
        extra as i32 + 1
    };

    if !(0..table.total_values).contains(&code) {
        bail!(DecodingError::InvalidCode);
    }

    let code = if code & 1 == 1 {
        -1 - code / 2
    } else {
        code / 2
    };

    gradient.sum += code.abs();
    if gradient.count == min_value {
        gradient.sum >>= 1;
        gradient.count >>= 1;
    }
    gradient.count += 1;

    Ok(code)
}
