#![no_main]

use libfuzzer_sys::fuzz_target;
use rawdec::{Array2DMut, OlympusDecompressor};

// Header layout (4 bytes):
// [0..2]  width (u16 LE)
// [2..4]  height (u16 LE)
// [4..]   ORF payload, including its 7-byte header

const HEADER_SIZE: usize = 4;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let width = u16::from_le_bytes([data[0], data[1]]) as usize;
    let height = u16::from_le_bytes([data[2], data[3]]) as usize;

    // Let's ignore larger images so we don't time out.
    if width * height > 1 << 20 {
        return;
    }

    if let Ok(decompressor) = OlympusDecompressor::new(width, height) {
        let mut pixels = vec![0_u16; width * height];
        let Some(mut out) = Array2DMut::new_packed(&mut pixels, width, height) else {
            return;
        };
        let _ = decompressor.decompress(&data[HEADER_SIZE..], &mut out);
    }
});
