//! Value remap tables built from vendor-supplied curves.
//!
//! A [`TableLookUp`] holds one or more tables of `2 * 65536` samples each. Without
//! dithering, a table is a plain mapping from a 16-bit input to a 16-bit output stored
//! in the first half. With dithering, every input maps to a pair of a bias-corrected
//! base value and a delta, and [`RemapTable::apply`] spreads outputs between
//! `base` and roughly `base + delta / 2` using a cheap pseudo-random walk.

use crate::error::{Result, TableError, bail};
use crate::math::{clamp_bits, lossless_cast};

/// The number of distinct inputs a table maps.
pub const TABLE_MAX_ELTS: usize = u16::MAX as usize + 1;
/// The number of samples stored per table.
pub const TABLE_SIZE: usize = TABLE_MAX_ELTS * 2;

/// A set of value remap tables.
#[derive(Debug, Clone)]
pub struct TableLookUp {
    tables: Vec<u16>,
    ntables: usize,
    dither: bool,
}

impl TableLookUp {
    /// Create `ntables` zero-initialized tables.
    pub fn new(ntables: usize, dither: bool) -> Result<Self> {
        if ntables < 1 {
            bail!(TableError::NoTables);
        }

        Ok(Self {
            tables: vec![0; ntables * TABLE_SIZE],
            ntables,
            dither,
        })
    }

    /// The number of tables.
    pub fn ntables(&self) -> usize {
        self.ntables
    }

    /// Whether the tables are dithered.
    pub fn dither(&self) -> bool {
        self.dither
    }

    /// Fill table `ntable` from the given curve.
    ///
    /// Inputs beyond the end of the curve map to its last entry.
    pub fn set_table(&mut self, ntable: usize, curve: &[u16]) -> Result<()> {
        let Some(&last) = curve.last() else {
            bail!(TableError::EmptyCurve);
        };

        if curve.len() > TABLE_MAX_ELTS {
            bail!(TableError::TooManyEntries);
        }

        if ntable >= self.ntables {
            bail!(TableError::InvalidIndex);
        }

        let start = ntable * TABLE_SIZE;
        let t = &mut self.tables[start..start + TABLE_SIZE];

        if !self.dither {
            for (i, out) in t[..TABLE_MAX_ELTS].iter_mut().enumerate() {
                *out = curve.get(i).copied().unwrap_or(last);
            }

            return Ok(());
        }

        let nfilled = curve.len();

        for (i, &center) in curve.iter().enumerate() {
            let center = center as i32;
            let lower = if i > 0 { curve[i - 1] as i32 } else { center };
            let upper = if i + 1 < nfilled {
                curve[i + 1] as i32
            } else {
                center
            };

            // Don't interpolate across a non-monotonic cross-over.
            let lower = lower.min(center);
            let upper = upper.max(center);
            let delta = upper - lower;
            debug_assert!(delta >= 0);

            t[i * 2] = clamp_bits(center - ((upper - lower + 2) / 4), 16);
            t[i * 2 + 1] = lossless_cast(delta);
        }

        for pair in t.chunks_exact_mut(2).skip(nfilled) {
            pair[0] = last;
            pair[1] = 0;
        }

        Ok(())
    }

    /// Return the raw samples of table `n`.
    pub fn get_table(&self, n: usize) -> Result<&[u16]> {
        if n >= self.ntables {
            bail!(TableError::InvalidIndex);
        }

        let start = n * TABLE_SIZE;

        Ok(&self.tables[start..start + TABLE_SIZE])
    }

    /// Return a view of table `n` that can remap individual values.
    pub fn table(&self, n: usize) -> Result<RemapTable<'_>> {
        Ok(RemapTable {
            data: self.get_table(n)?,
            dither: self.dither,
        })
    }
}

/// A read-only view of a single remap table.
#[derive(Debug, Clone, Copy)]
pub struct RemapTable<'a> {
    data: &'a [u16],
    dither: bool,
}

impl RemapTable<'_> {
    /// Remap a single value.
    ///
    /// `random` is the state of the dithering walk and is only advanced for dithered
    /// tables. Callers typically seed it per row.
    #[inline]
    pub fn apply(&self, value: u16, random: &mut u32) -> u16 {
        let value = value as usize;

        if !self.dither {
            return self.data[value];
        }

        let base = self.data[value * 2] as u32;
        let delta = self.data[value * 2 + 1] as u32;
        let r = *random;

        let pix = base + ((delta * (r & 2047) + 1024) >> 12);
        *random = 15700 * (r & 65535) + (r >> 16);

        pix.min(u16::MAX as u32) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn zero_tables() {
        assert_eq!(
            TableLookUp::new(0, false).unwrap_err(),
            DecodeError::Table(TableError::NoTables)
        );
    }

    #[test]
    fn invalid_curves() {
        let mut lookup = TableLookUp::new(2, false).unwrap();

        assert_eq!(
            lookup.set_table(0, &[]).unwrap_err(),
            DecodeError::Table(TableError::EmptyCurve)
        );
        assert_eq!(
            lookup.set_table(0, &vec![0; TABLE_MAX_ELTS + 1]).unwrap_err(),
            DecodeError::Table(TableError::TooManyEntries)
        );
        assert_eq!(
            lookup.set_table(2, &[1, 2, 3]).unwrap_err(),
            DecodeError::Table(TableError::InvalidIndex)
        );
        assert!(lookup.get_table(2).is_err());
        assert!(lookup.set_table(1, &vec![7; TABLE_MAX_ELTS]).is_ok());
    }

    #[test]
    fn flat_table_extends_last_entry() {
        let mut lookup = TableLookUp::new(2, false).unwrap();
        lookup.set_table(1, &[10, 20, 30]).unwrap();

        let t = lookup.get_table(1).unwrap();
        assert_eq!(t.len(), TABLE_SIZE);
        assert_eq!(&t[..5], &[10, 20, 30, 30, 30]);
        assert_eq!(t[TABLE_MAX_ELTS - 1], 30);
        assert!(lookup.get_table(0).unwrap().iter().all(|v| *v == 0));

        let table = lookup.table(1).unwrap();
        let mut random = 1234;
        assert_eq!(table.apply(1, &mut random), 20);
        assert_eq!(table.apply(60000, &mut random), 30);
        assert_eq!(random, 1234);
    }

    #[test]
    fn dithered_table_layout() {
        let curve: Vec<u16> = (0..10).map(|i| i * 100).collect();
        let mut lookup = TableLookUp::new(1, true).unwrap();
        lookup.set_table(0, &curve).unwrap();

        let t = lookup.get_table(0).unwrap();
        // The first entry only looks upwards.
        assert_eq!((t[0], t[1]), (0, 100));
        // Interior entries span both neighbours.
        assert_eq!((t[10], t[11]), (450, 200));
        // The last entry only looks downwards.
        assert_eq!((t[18], t[19]), (875, 100));
        // Everything past the curve is flat.
        assert_eq!((t[20], t[21]), (900, 0));
        assert_eq!((t[TABLE_SIZE - 2], t[TABLE_SIZE - 1]), (900, 0));
    }

    #[test]
    fn dithering_stays_between_neighbours() {
        let curve: Vec<u16> = (0..64).map(|i| 1000 + i * 100).collect();
        let mut lookup = TableLookUp::new(1, true).unwrap();
        lookup.set_table(0, &curve).unwrap();
        let table = lookup.table(0).unwrap();

        let mut random = 0x1234_5678;

        for i in 1..63 {
            for _ in 0..64 {
                let v = table.apply(i as u16, &mut random);
                assert!(curve[i - 1] <= v && v <= curve[i + 1], "{i}: {v}");
            }
        }
    }

    #[test]
    fn dithering_respects_non_monotonic_curves() {
        let curve = [0, 100, 50, 50, 60];
        let mut lookup = TableLookUp::new(1, true).unwrap();
        lookup.set_table(0, &curve).unwrap();
        let t = lookup.get_table(0).unwrap();

        // The peak only interpolates towards the rising side.
        assert_eq!(t[3], 100);
        // After the drop, the plateau does not reach back up to the peak.
        assert_eq!((t[4], t[5]), (50, 0));

        let table = lookup.table(0).unwrap();
        let mut random = 99;
        for _ in 0..256 {
            assert_eq!(table.apply(2, &mut random), 50);
        }
    }
}
