#![no_main]

use libfuzzer_sys::fuzz_target;
use rawdec::fuji::{FujiDecompressor, RGGB_CFA, Sensor, XTRANS_CFA};
use rawdec::Array2DMut;

fuzz_target!(|data: &[u8]| {
    let Ok(decompressor) = FujiDecompressor::from_payload(data, RGGB_CFA) else {
        return;
    };

    let cfa = match decompressor.header().sensor() {
        Sensor::Bayer => RGGB_CFA,
        Sensor::XTrans => XTRANS_CFA,
    };
    let Ok(decompressor) = FujiDecompressor::new(*decompressor.header(), cfa) else {
        return;
    };

    let (width, height) = (decompressor.width(), decompressor.height());

    // Let's ignore larger images so we don't time out.
    if width * height > 1 << 22 {
        return;
    }

    let mut pixels = vec![0_u16; width * height];
    let Some(mut out) = Array2DMut::new_packed(&mut pixels, width, height) else {
        return;
    };
    let _ = decompressor.decompress(data, &mut out);
});
