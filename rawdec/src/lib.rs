/*!
A memory-safe decompression engine for vendor-specific camera RAW payloads.

`rawdec` reproduces the predictive entropy coders that camera vendors use to store
sensor data inside RAW files. It does not parse containers: the caller locates the
compressed payload, knows the image dimensions and provides a destination buffer.

Two structurally different schemes are supported:
- Olympus ORF, a strictly sequential adaptive-carry coder
  ([`OlympusDecompressor`]).
- Fuji compressed RAF, a strip-parallel gradient coder for Bayer and X-Trans sensors,
  both lossless and lossy ([`FujiDecompressor`]).

Both decoders write into an [`Array2DMut`] view and never read out of bounds, no matter
how malformed the input is. Corrupt payloads are reported as [`DecodeError`]s.

# Example
```rust,no_run
use rawdec::{Decompressor, OlympusDecompressor};
use rawdec_common::array2d::Array2DMut;

let data = std::fs::read("image.orf.bin").unwrap();
let (width, height) = (4640, 3472);

let decompressor = Decompressor::Olympus(OlympusDecompressor::new(width, height).unwrap());
let mut pixels = vec![0_u16; width * height];
let mut out = Array2DMut::new_packed(&mut pixels, width, height).unwrap();
decompressor.decompress(&data, &mut out).unwrap();
```

# Parallel decoding
Fuji strips are independent. The engine doesn't spawn threads itself, but hands out
disjoint strip outputs that can be decoded concurrently:
```rust,no_run
use rawdec::fuji::{FujiDecompressor, XTRANS_CFA};
use rawdec_common::array2d::Array2DMut;

let data = std::fs::read("image.raf.bin").unwrap();
let decompressor = FujiDecompressor::from_payload(&data, XTRANS_CFA).unwrap();
let (width, height) = (decompressor.width(), decompressor.height());

let mut pixels = vec![0_u16; width * height];
let mut out = Array2DMut::new_packed(&mut pixels, width, height).unwrap();

let strips = decompressor.strips(&data).unwrap();
let outputs = decompressor.strip_outputs(&mut out).unwrap();

std::thread::scope(|s| {
    for (strip, mut output) in strips.iter().zip(outputs) {
        let decompressor = &decompressor;
        s.spawn(move || decompressor.decode_strip(strip, &mut output));
    }
});
```

# Cargo features
- `logging` (enabled by default): Emit diagnostics through the `log` crate.

# Safety
Unsafe code is confined to the aligned allocator.
*/

#![deny(unsafe_code)]
#![deny(missing_docs)]

#[allow(unsafe_code)]
pub mod alloc;
pub mod error;
pub mod fuji;
mod log;
pub mod lookup;
mod lut;
mod math;
pub mod olympus;

pub use error::{DecodeError, Result};
pub use fuji::FujiDecompressor;
pub use olympus::OlympusDecompressor;
pub use rawdec_common::array2d::{Array2DMut, Array2DRef};

/// A decompressor for one of the supported vendor formats.
#[derive(Debug, Clone)]
pub enum Decompressor {
    /// An Olympus ORF payload.
    Olympus(OlympusDecompressor),
    /// A Fuji compressed RAF payload.
    Fuji(FujiDecompressor),
}

impl Decompressor {
    /// The width of the decoded image.
    pub fn width(&self) -> usize {
        match self {
            Self::Olympus(d) => d.width(),
            Self::Fuji(d) => d.width(),
        }
    }

    /// The height of the decoded image.
    pub fn height(&self) -> usize {
        match self {
            Self::Olympus(d) => d.height(),
            Self::Fuji(d) => d.height(),
        }
    }

    /// Decompress `input` into `out`, which must have the dimensions of the image.
    pub fn decompress(&self, input: &[u8], out: &mut Array2DMut<'_, u16>) -> Result<()> {
        match self {
            Self::Olympus(d) => d.decompress(input, out),
            Self::Fuji(d) => d.decompress(input, out),
        }
    }
}

impl From<OlympusDecompressor> for Decompressor {
    fn from(d: OlympusDecompressor) -> Self {
        Self::Olympus(d)
    }
}

impl From<FujiDecompressor> for Decompressor {
    fn from(d: FujiDecompressor) -> Self {
        Self::Fuji(d)
    }
}
