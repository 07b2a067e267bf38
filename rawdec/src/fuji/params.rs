//! Quantization tables and coding parameters.

use crate::fuji::header::FujiHeader;
use crate::math::log2_ceil;

/// A quantization table mapping local differences to gradient buckets.
#[derive(Debug, Clone)]
pub(crate) struct QTable {
    /// The quantization step, `0` for lossless coding.
    pub(crate) q_base: i32,
    /// Bucket per difference, indexed by `difference + max_value`.
    table: Vec<i8>,
    /// The largest local difference sum this table is used for.
    pub(crate) max_grad: i32,
    /// The multiplier of the first bucket when forming a gradient index.
    grad_mult: i32,
    /// The number of bits of an escaped code.
    pub(crate) raw_bits: u32,
    /// The number of distinct codes.
    pub(crate) total_values: i32,
}

impl QTable {
    /// Build the main table for the given quantization step.
    pub(crate) fn main(max_value: i32, q_base: i32) -> Self {
        let limit = max_value + 1;

        let mut qp = [
            q_base,
            3 * q_base + 0x12,
            5 * q_base + 0x43,
            7 * q_base + 0x114,
            max_value,
        ];

        if qp[1] >= limit || qp[1] < q_base + 1 {
            qp[1] = q_base + 1;
        }

        if qp[2] < qp[1] || qp[2] >= limit {
            qp[2] = qp[1];
        }

        if qp[3] < qp[2] || qp[3] >= limit {
            qp[3] = qp[2];
        }

        let total_values = (max_value + 2 * q_base) / (2 * q_base + 1) + 1;

        Self {
            q_base,
            table: build_table(&qp),
            max_grad: 0,
            grad_mult: 9,
            raw_bits: log2_ceil(total_values as u32),
            total_values,
        }
    }

    /// Build one of the fixed tables used for flat areas in lossy mode.
    fn fixed(max_value: i32, q_base: i32, max_grad: i32, points: [i32; 3]) -> Self {
        let mut qp = [q_base, 0, 0, 0, max_value];
        qp[1] = if max_value >= points[0] {
            points[0]
        } else {
            qp[0] + 1
        };
        qp[2] = if max_value >= points[1] {
            points[1]
        } else {
            qp[1]
        };
        qp[3] = if max_value >= points[2] {
            points[2]
        } else {
            qp[2]
        };

        let total_values = (max_value + 2 * q_base) / (2 * q_base + 1) + 1;

        Self {
            q_base,
            table: build_table(&qp),
            max_grad,
            grad_mult: 3,
            raw_bits: log2_ceil(total_values as u32),
            total_values,
        }
    }

    /// Combine the buckets of two local differences into a signed gradient index.
    #[inline(always)]
    pub(crate) fn gradient(&self, max_value: i32, d1: i32, d2: i32) -> i32 {
        let bucket = |d: i32| self.table[(max_value + d) as usize] as i32;

        self.grad_mult * bucket(d1) + bucket(d2)
    }

    /// The initial magnitude sum of the gradients coded with this table.
    pub(crate) fn initial_gradient(&self) -> i32 {
        2.max((self.total_values + 0x20) >> 6)
    }
}

fn build_table(qp: &[i32; 5]) -> Vec<i8> {
    let max_value = qp[4];

    (-max_value..=max_value)
        .map(|v| {
            if v <= -qp[3] {
                -4
            } else if v <= -qp[2] {
                -3
            } else if v <= -qp[1] {
                -2
            } else if v < -qp[0] {
                -1
            } else if v <= qp[0] {
                0
            } else if v < qp[1] {
                1
            } else if v < qp[2] {
                2
            } else if v < qp[3] {
                3
            } else {
                4
            }
        })
        .collect()
}

/// The coding parameters shared by all strips.
#[derive(Debug, Clone)]
pub(crate) struct FujiParams {
    /// The main table. In lossy mode, it is rebuilt whenever the step changes.
    pub(crate) main: QTable,
    /// The fixed tables for flat areas, only used in lossy mode.
    pub(crate) fixed: Vec<QTable>,
    pub(crate) max_bits: i32,
    pub(crate) min_value: i32,
    pub(crate) max_value: i32,
    pub(crate) line_width: usize,
}

impl FujiParams {
    pub(crate) fn new(header: &FujiHeader) -> Self {
        let max_value = header.max_value();

        let fixed = if header.is_lossless() {
            vec![]
        } else {
            vec![
                QTable::fixed(max_value, 0, 5, [0x12, 0x43, 0x114]),
                QTable::fixed(max_value, 1, 6, [0x15, 0x48, 0x11B]),
                QTable::fixed(max_value, 2, 7, [0x18, 0x4D, 0x122]),
            ]
        };

        Self {
            main: QTable::main(max_value, 0),
            fixed,
            max_bits: 4 * log2_ceil(max_value as u32 + 1) as i32,
            min_value: 0x40,
            max_value,
            line_width: header.sensor().line_width(header.block_size as usize),
        }
    }

    /// Select a fixed table for a local difference sum, if the current step allows it.
    #[inline(always)]
    pub(crate) fn select_fixed(&self, diff_sum: i32) -> Option<usize> {
        for (i, table) in self.fixed.iter().enumerate() {
            if self.main.q_base < i as i32 + 1 {
                break;
            }

            if diff_sum <= table.max_grad {
                return Some(i);
            }
        }

        None
    }
}
