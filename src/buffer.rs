//! Border-padded 2-D buffers.
//!
//! A `Padded` buffer is a single allocation holding the image plus a
//! reflected border on every side. The "without border" view is plain index
//! math over the same storage, so windowed reads near the image edge never
//! need bounds checks as long as the window stays inside the border.

use std::sync::atomic::AtomicU64;

use crate::unsync::{Packed, UnsyncVec};
use crate::Dims;

/// A pixel coordinate, row first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    #[inline]
    pub(crate) fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    #[inline]
    pub(crate) fn squared_distance(self, other: Self) -> i64 {
        let dr = i64::from(self.row - other.row);
        let dc = i64::from(self.col - other.col);
        dr * dr + dc * dc
    }
}

impl Packed for Pos {
    type Word = AtomicU64;

    #[inline]
    fn pack(self) -> u64 {
        u64::from(self.row as u32) << 32 | u64::from(self.col as u32)
    }

    #[inline]
    fn unpack(word: u64) -> Self {
        Self {
            row: (word >> 32) as u32 as i32,
            col: word as u32 as i32,
        }
    }
}

/// Maps an out of range index back into `0..len` by mirroring around the
/// edge, repeating the edge sample (`fedcba|abcdef|fedcba`).
#[inline]
pub(crate) fn reflect(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let r = i.rem_euclid(period);
    if r < len as isize {
        r as usize
    } else {
        (period - 1 - r) as usize
    }
}

pub(crate) struct Padded<T: Packed> {
    data: UnsyncVec<T>,
    dims: Dims,
    border: usize,
    stride: usize,
}

impl<T: Packed> Padded<T> {
    pub fn filled(dims: Dims, border: usize, value: T) -> Self {
        let stride = dims.width as usize + 2 * border;
        let rows = dims.height as usize + 2 * border;
        Self {
            data: UnsyncVec::filled(value, stride * rows),
            dims,
            border,
            stride,
        }
    }

    /// Builds a bordered copy of a row-major interior buffer.
    pub fn from_interior(dims: Dims, border: usize, interior: &[T]) -> Self {
        debug_assert_eq!(interior.len(), dims.width as usize * dims.height as usize);

        let padded = Self::filled(dims, border, interior[0]);
        for (i, value) in interior.iter().enumerate() {
            let row = i / dims.width as usize;
            let col = i - row * dims.width as usize;
            padded.set(Pos::new(row as i32, col as i32), *value);
        }
        padded.refresh_border();
        padded
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    fn index(&self, pos: Pos) -> usize {
        let row = (pos.row + self.border as i32) as usize;
        let col = (pos.col + self.border as i32) as usize;
        debug_assert!(col < self.stride, "column {} outside the border", pos.col);
        row * self.stride + col
    }

    /// Reads a value, `pos` is relative to the top left of the interior and
    /// may reach up to `border` pixels outside of it.
    #[inline]
    pub fn get(&self, pos: Pos) -> T {
        self.data.get(self.index(pos))
    }

    #[inline]
    pub fn set(&self, pos: Pos, value: T) {
        self.data.assign_at(self.index(pos), value);
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && pos.row < self.dims.height as i32
            && pos.col < self.dims.width as i32
    }

    /// Rewrites the border from the current interior.
    pub fn refresh_border(&self) {
        let b = self.border as i32;
        let (w, h) = (self.dims.width as i32, self.dims.height as i32);

        for row in -b..h + b {
            let inside_rows = row >= 0 && row < h;
            for col in -b..w + b {
                if inside_rows && col >= 0 && col < w {
                    continue;
                }

                let src = Pos::new(
                    reflect(row as isize, h as usize) as i32,
                    reflect(col as isize, w as usize) as i32,
                );
                self.set(Pos::new(row, col), self.get(src));
            }
        }
    }

    /// Row-major copy of the interior.
    pub fn interior(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.dims.width as usize * self.dims.height as usize);
        for row in 0..self.dims.height as i32 {
            for col in 0..self.dims.width as i32 {
                out.push(self.get(Pos::new(row, col)));
            }
        }
        out
    }
}

impl<T: Packed> Clone for Padded<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims,
            border: self.border,
            stride: self.stride,
        }
    }
}

/// A snapshot of the nearest-neighbor field of one pyramid level.
///
/// Every entry holds the coordinate of the pixel used to reconstruct the
/// pixel at that location.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionMap {
    pub(crate) dims: Dims,
    pub(crate) entries: Vec<Pos>,
}

impl PositionMap {
    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn get(&self, row: u32, col: u32) -> Pos {
        self.entries[row as usize * self.dims.width as usize + col as usize]
    }

    pub fn entries(&self) -> &[Pos] {
        &self.entries
    }
}
