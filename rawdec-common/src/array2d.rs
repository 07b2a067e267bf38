//! Non-owning, strided two-dimensional views over flat buffers.
//!
//! A view is described by its `width` and `height` in elements and a `pitch`, the
//! distance in elements between the starts of two consecutive rows. The pitch is at
//! least as large as the width, and the backing slice must cover
//! `pitch * (height - 1) + width` elements.

use core::ops::{Index, IndexMut};

fn required_len(width: usize, height: usize, pitch: usize) -> Option<usize> {
    if pitch < width {
        return None;
    }

    if height == 0 {
        return Some(0);
    }

    pitch.checked_mul(height - 1)?.checked_add(width)
}

/// A read-only 2D view.
#[derive(Debug, Clone, Copy)]
pub struct Array2DRef<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    pitch: usize,
}

impl<'a, T> Array2DRef<'a, T> {
    /// Create a new view, returning `None` if the slice is too small for the geometry.
    pub fn new(data: &'a [T], width: usize, height: usize, pitch: usize) -> Option<Self> {
        if data.len() < required_len(width, height, pitch)? {
            return None;
        }

        Some(Self {
            data,
            width,
            height,
            pitch,
        })
    }

    /// Create a new view over a tightly packed buffer.
    pub fn new_packed(data: &'a [T], width: usize, height: usize) -> Option<Self> {
        Self::new(data, width, height, width)
    }

    /// The width of the view.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the view.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The pitch of the view.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Return the given row.
    #[inline]
    pub fn row(&self, row: usize) -> Option<&'a [T]> {
        if row >= self.height {
            return None;
        }

        let start = row * self.pitch;
        self.data.get(start..start + self.width)
    }

    /// Return the element at the given position.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&'a T> {
        self.row(row)?.get(col)
    }

    /// Return an iterator over all rows.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.height).filter_map(|row| self.row(row))
    }

    /// Return a sub-view starting at `(row, col)` with the given dimensions.
    pub fn crop(&self, row: usize, col: usize, width: usize, height: usize) -> Option<Self> {
        if col.checked_add(width)? > self.width || row.checked_add(height)? > self.height {
            return None;
        }

        let start = (row * self.pitch + col).min(self.data.len());
        Self::new(&self.data[start..], width, height, self.pitch)
    }
}

impl<T> Index<(usize, usize)> for Array2DRef<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.height && col < self.width);
        &self.data[row * self.pitch + col]
    }
}

/// A mutable 2D view.
#[derive(Debug)]
pub struct Array2DMut<'a, T> {
    data: &'a mut [T],
    width: usize,
    height: usize,
    pitch: usize,
}

impl<'a, T> Array2DMut<'a, T> {
    /// Create a new view, returning `None` if the slice is too small for the geometry.
    pub fn new(data: &'a mut [T], width: usize, height: usize, pitch: usize) -> Option<Self> {
        if data.len() < required_len(width, height, pitch)? {
            return None;
        }

        Some(Self {
            data,
            width,
            height,
            pitch,
        })
    }

    /// Create a new view over a tightly packed buffer.
    pub fn new_packed(data: &'a mut [T], width: usize, height: usize) -> Option<Self> {
        Self::new(data, width, height, width)
    }

    /// The width of the view.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the view.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The pitch of the view.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Reborrow as a read-only view.
    pub fn view(&self) -> Array2DRef<'_, T> {
        Array2DRef {
            data: &*self.data,
            width: self.width,
            height: self.height,
            pitch: self.pitch,
        }
    }

    /// Reborrow as a shorter-lived mutable view.
    pub fn reborrow(&mut self) -> Array2DMut<'_, T> {
        Array2DMut {
            data: &mut *self.data,
            width: self.width,
            height: self.height,
            pitch: self.pitch,
        }
    }

    /// Return the given row.
    #[inline]
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.height {
            return None;
        }

        let start = row * self.pitch;
        self.data.get(start..start + self.width)
    }

    /// Return the given row mutably.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> Option<&mut [T]> {
        if row >= self.height {
            return None;
        }

        let start = row * self.pitch;
        self.data.get_mut(start..start + self.width)
    }

    /// Return the element at the given position.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.row(row)?.get(col)
    }

    /// Return the element at the given position mutably.
    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.row_mut(row)?.get_mut(col)
    }

    /// Split the view into its disjoint rows.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [T]> + '_ {
        let width = self.width;
        let used = required_len(self.width, self.height, self.pitch).unwrap_or(0);

        // The last row may be shorter than the pitch.
        self.data[..used]
            .chunks_mut(self.pitch.max(1))
            .map(move |row| &mut row[..width])
    }

    /// Consume the view and return a sub-view starting at `(row, col)` with the given
    /// dimensions.
    pub fn crop(self, row: usize, col: usize, width: usize, height: usize) -> Option<Self> {
        if col.checked_add(width)? > self.width || row.checked_add(height)? > self.height {
            return None;
        }

        let pitch = self.pitch;
        let data = self.data;
        let start = (row * pitch + col).min(data.len());
        Self::new(&mut data[start..], width, height, pitch)
    }
}

impl<T> Index<(usize, usize)> for Array2DMut<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.height && col < self.width);
        &self.data[row * self.pitch + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Array2DMut<'_, T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.height && col < self.width);
        &mut self.data[row * self.pitch + col]
    }
}
