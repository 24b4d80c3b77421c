//! A minimal dense 2D buffer used for padded ids and attention masks.
//!
//! Rows follow the reserved dimension layout in [`constant`]: dimension `0` is the
//! batch, dimension `1` is the sequence.

pub mod constant;

use std::ops::Index;

/// Row-major `[rows, cols]` matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone> Matrix<T> {
    /// A `rows x cols` matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Mutable access to row `row`.
    ///
    /// # Panics
    ///
    /// If `row >= self.rows()`.
    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.cols;
        &mut self.data[start..start + self.cols]
    }
}

impl<T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `[batch, sequence]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Row `row`, or `None` when out of range.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    /// Iterates rows in batch order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) panics, a zero-width matrix still has `rows` empty rows
        (0..self.rows).map(move |r| &self.data[r * self.cols..(r + 1) * self.cols])
    }

    /// The flat row-major buffer, as a tensor backend expects it.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<u8> {
    /// Per-row count of set positions, i.e. the unpadded length of each row of a mask.
    pub fn row_sums(&self) -> Vec<usize> {
        self.iter_rows()
            .map(|row| row.iter().map(|&v| v as usize).sum())
            .collect()
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(col < self.cols, "column {} out of bounds for width {}", col, self.cols);
        &self.data[row * self.cols + col]
    }
}
