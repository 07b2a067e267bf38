//! Tracks the aligned allocations made while decoding.

use rawdec::alloc::{AlignedVec, DEFAULT_ALIGNMENT};
use rawdec::fuji::{FujiDecompressor, FujiHeader, RGGB_CFA, SIGNATURE};
use rawdec::Array2DMut;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingAllocator;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static RELEASED: AtomicUsize = AtomicUsize::new(0);
static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

// Counters are shared, so tests inspecting them must not overlap.
static LOCK: Mutex<()> = Mutex::new(());

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() >= DEFAULT_ALIGNMENT {
            ALLOCATED.fetch_add(1, Ordering::SeqCst);
            LIVE_BYTES.fetch_add(layout.size(), Ordering::SeqCst);
        }

        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.align() >= DEFAULT_ALIGNMENT {
            RELEASED.fetch_add(1, Ordering::SeqCst);
            LIVE_BYTES.fetch_sub(layout.size(), Ordering::SeqCst);
        }

        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn counts() -> (usize, usize) {
    (
        ALLOCATED.load(Ordering::SeqCst),
        RELEASED.load(Ordering::SeqCst),
    )
}

#[test]
fn aligned_vec_is_released() {
    let _guard = LOCK.lock().unwrap();
    let (allocated, released) = counts();

    {
        let buf = AlignedVec::<u16>::zeroed(1000).unwrap();
        assert_eq!(buf.len(), 1000);
        assert_eq!(counts(), (allocated + 1, released));
        // 2000 bytes, padded to the alignment.
        assert!(LIVE_BYTES.load(Ordering::SeqCst) >= 2048);
    }

    assert_eq!(counts(), (allocated + 1, released + 1));
}

#[test]
fn decoding_releases_line_buffers() {
    let _guard = LOCK.lock().unwrap();

    let header = FujiHeader {
        signature: SIGNATURE,
        version: 1,
        raw_type: 0,
        raw_bits: 12,
        raw_height: 6,
        raw_rounded_width: 768,
        raw_width: 768,
        block_size: 0x300,
        blocks_in_row: 1,
        total_lines: 1,
    };

    let mut state = 0x9E37_79B9_u32;
    let strip: Vec<u8> = (0..16384)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            ((state >> 24) as u8) | 0x55
        })
        .collect();

    let mut data = header.to_bytes().to_vec();
    data.extend((strip.len() as u32).to_be_bytes());
    data.extend([0; 12]);
    data.extend(&strip);

    let decompressor = FujiDecompressor::new(header, RGGB_CFA).unwrap();
    let mut pixels = vec![0_u16; 768 * 6];
    let mut out = Array2DMut::new_packed(&mut pixels, 768, 6).unwrap();

    let (allocated, released) = counts();
    let live = LIVE_BYTES.load(Ordering::SeqCst);

    decompressor.decompress(&data, &mut out).unwrap();

    let (now_allocated, now_released) = counts();
    assert!(now_allocated > allocated);
    assert_eq!(now_allocated - allocated, now_released - released);
    assert_eq!(LIVE_BYTES.load(Ordering::SeqCst), live);
}
