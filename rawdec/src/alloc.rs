//! Allocation of over-aligned buffers.
//!
//! The line buffers of the decoders are allocated with a fixed byte alignment so that
//! every buffer starts on a cache line (or SIMD register) boundary. Allocations are
//! rounded up to a multiple of the alignment. The padding past the last element is
//! never initialized.

use crate::error::{AllocError, Result};
use bytemuck::Zeroable;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use std::alloc::{alloc, dealloc};

/// The alignment used for line buffers.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// An allocator handing out memory aligned to `ALIGN` bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlignedAllocator<const ALIGN: usize>;

impl<const ALIGN: usize> AlignedAllocator<ALIGN> {
    /// Create a new allocator.
    pub const fn new() -> Self {
        Self
    }

    /// The alignment of every returned pointer, in bytes.
    pub const fn alignment(&self) -> usize {
        ALIGN
    }

    fn layout<T>(n: usize) -> Result<Layout> {
        const {
            assert!(ALIGN.is_power_of_two(), "alignment must be a power of two");
            assert!(ALIGN >= align_of::<T>(), "insufficient alignment");
        }

        assert!(n > 0, "attempted to allocate zero elements");

        let bytes = size_of::<T>()
            .checked_mul(n)
            .ok_or(AllocError::SizeOverflow)?;
        let padded = bytes
            .checked_next_multiple_of(ALIGN)
            .ok_or(AllocError::SizeOverflow)?;

        Layout::from_size_align(padded, ALIGN).map_err(|_| AllocError::SizeOverflow.into())
    }

    /// Allocate uninitialized memory for `n` elements of type `T`.
    ///
    /// `n` must not be zero.
    pub fn allocate<T>(&self, n: usize) -> Result<NonNull<T>> {
        let layout = Self::layout::<T>(n)?;
        let bytes = layout.size();

        // Refuse absurd requests instead of aborting the fuzzer.
        #[cfg(fuzzing)]
        if bytes > 2 << 30 {
            return Err(AllocError::OutOfMemory { bytes }.into());
        }

        // SAFETY: `layout` has a non-zero size, since `n > 0` and the size is rounded up
        // to a non-zero alignment.
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr.cast::<T>()).ok_or(AllocError::OutOfMemory { bytes })?;

        debug_assert!(ptr.as_ptr().addr().is_multiple_of(ALIGN));

        Ok(ptr)
    }

    /// Release memory obtained from [`AlignedAllocator::allocate`].
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate::<T>(n)` of an allocator with the same
    /// alignment, with the same `n`, and must not have been released already.
    pub unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        // The layout was already valid when the memory was handed out.
        if let Ok(layout) = Self::layout::<T>(n) {
            // SAFETY: Guaranteed by the caller.
            unsafe { dealloc(ptr.as_ptr().cast(), layout) };
        }
    }
}

impl<const A: usize, const B: usize> PartialEq<AlignedAllocator<B>> for AlignedAllocator<A> {
    fn eq(&self, _: &AlignedAllocator<B>) -> bool {
        A == B
    }
}

impl<const A: usize> Eq for AlignedAllocator<A> {}

/// A fixed-length, zero-initialized buffer aligned to `ALIGN` bytes.
pub struct AlignedVec<T, const ALIGN: usize = DEFAULT_ALIGNMENT> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Zeroable + Copy, const ALIGN: usize> AlignedVec<T, ALIGN> {
    /// Allocate a buffer of `len` zeroed elements.
    pub fn zeroed(len: usize) -> Result<Self> {
        let ptr = AlignedAllocator::<ALIGN>::new().allocate::<T>(len)?;

        // SAFETY: The allocation holds at least `len` elements and the all-zero bit
        // pattern is a valid `T`.
        unsafe { ptr.as_ptr().write_bytes(0, len) };

        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }
}

impl<T, const ALIGN: usize> Deref for AlignedVec<T, ALIGN> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` points to `len` initialized elements owned by `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, const ALIGN: usize> DerefMut for AlignedVec<T, ALIGN> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: `ptr` points to `len` initialized elements exclusively owned by `self`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, const ALIGN: usize> Drop for AlignedVec<T, ALIGN> {
    fn drop(&mut self) {
        // SAFETY: The pointer was obtained from an allocator with the same alignment and
        // element count. Elements are `Copy` and need no dropping.
        unsafe { AlignedAllocator::<ALIGN>::new().deallocate(self.ptr, self.len) };
    }
}

impl<T: fmt::Debug, const ALIGN: usize> fmt::Debug for AlignedVec<T, ALIGN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// SAFETY: `AlignedVec` uniquely owns its elements, like `Vec`.
unsafe impl<T: Send, const ALIGN: usize> Send for AlignedVec<T, ALIGN> {}
// SAFETY: Shared access only hands out shared references to the elements.
unsafe impl<T: Sync, const ALIGN: usize> Sync for AlignedVec<T, ALIGN> {}
