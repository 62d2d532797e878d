//! Dense row-major matrix storage.
//!
//! # Core Matrix Utilities
//!
//! [`Matrix`] is the only numeric container in the crate: a row count, a
//! column count, and one flat `Vec<f64>` holding the cells row after row.
//!
//! It supports:
//! - Construction from flat data, nested rows, a generator closure, or the
//!   [`matrix!`](crate::matrix!) literal macro
//! - Bounds-checked cell access that panics on invalid indices
//! - Borrowing whole rows or the flat buffer for kernels
//!
//! ## Design Highlights
//! - The fields are private, so `data.len() == rows * cols` holds for the
//!   lifetime of every value
//! - Operations never allocate their result; callers hand in a reusable
//!   output buffer (see [`Engine`](crate::Engine))
//!
//! ## Example
//!
//! ```rust
//! use briny_matrix::Matrix;
//! let m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(m.get(1, 2), 6.0);
//! ```

use core::fmt;
use core::ops::{Index, IndexMut};

use crate::error::{MatrixError, Result};

/// Row and column counts of a matrix, displayed as `RxC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// Creates a shape.
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of cells in a matrix of this shape.
    ///
    /// # Panics
    /// Panics if the count does not fit in `usize`.
    #[must_use]
    pub const fn len(self) -> usize {
        match self.checked_len() {
            Some(len) => len,
            None => panic!("shape cell count overflows usize"),
        }
    }

    /// Number of cells, or `None` if the count does not fit in `usize`.
    #[must_use]
    pub const fn checked_len(self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Whether a matrix of this shape holds no cells.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A dense two-dimensional `f64` buffer stored in row-major order.
///
/// Cell `(row, col)` lives at `data[row * cols + col]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a matrix from flat row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols` or the product overflows.
    #[track_caller]
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert!(
            Shape::new(rows, cols).checked_len() == Some(data.len()),
            "{rows}x{cols} matrix is incompatible with {} data elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    /// Creates a matrix from flat row-major data, reporting a length mismatch
    /// instead of panicking.
    ///
    /// # Errors
    /// - [`MatrixError::ShapeOverflow`] if `rows * cols` does not fit in `usize`.
    /// - [`MatrixError::DataLength`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let Some(cells) = Shape::new(rows, cols).checked_len() else {
            return Err(MatrixError::ShapeOverflow { rows, cols });
        };
        if data.len() != cells {
            return Err(MatrixError::DataLength {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Creates a matrix filled with zeros.
    ///
    /// # Panics
    /// Panics if `rows * cols` overflows.
    #[must_use]
    #[track_caller]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; cell_count(rows, cols)],
        }
    }

    /// Creates a matrix whose cell `(row, col)` is `f(row, col)`.
    ///
    /// # Panics
    /// Panics if `rows * cols` overflows.
    #[track_caller]
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(cell_count(rows, cols));
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    /// Creates a matrix from nested rows, the layout used when parameters
    /// are written to or read from JSON documents.
    ///
    /// An empty slice yields a `0x0` matrix.
    ///
    /// # Errors
    /// [`MatrixError::DimensionMismatch`] if the rows are ragged.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::DimensionMismatch {
                    op: "from_rows",
                    left: Shape::new(1, cols),
                    right: Shape::new(1, row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Copies the cells out as nested rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Row and column counts.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix has zero rows or zero columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[track_caller]
    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of range for {} matrix",
            self.shape()
        );
        row * self.cols + col
    }

    /// Reads cell `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= rows()` or `col >= cols()`. An invalid index means a
    /// layer was wired to the wrong matrix, which is not recoverable.
    #[inline]
    #[track_caller]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.offset(row, col)]
    }

    /// Reads cell `(row, col)`, or `None` when out of range.
    #[must_use]
    pub fn try_get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Writes cell `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= rows()` or `col >= cols()`.
    #[inline]
    #[track_caller]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.offset(row, col);
        self.data[i] = value;
    }

    /// Borrows one row.
    ///
    /// # Panics
    /// Panics if `row >= rows()`.
    #[inline]
    #[track_caller]
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.rows, "row {row} out of range for {} matrix", self.shape());
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// The flat row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The flat row-major buffer, mutably. Its length cannot change.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consumes the matrix, returning its flat buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[track_caller]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[self.offset(row, col)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[track_caller]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        let i = self.offset(row, col);
        &mut self.data[i]
    }
}

/// Defines a matrix from nested row literals.
///
/// # Panics
/// Panics if the rows have different lengths.
///
/// # Example
/// ```
/// use briny_matrix::matrix;
/// let m = matrix![[1.0, 2.0], [3.0, 4.0]];
/// assert_eq!(m.rows(), 2);
/// assert_eq!(m.get(1, 0), 3.0);
/// ```
#[macro_export]
macro_rules! matrix {
    () => {
        $crate::Matrix::zeros(0, 0)
    };

    ($( [ $( $x:expr ),* $(,)? ] ),+ $(,)?) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<f64>> = ::std::vec![
            $( ::std::vec![ $( $x as f64 ),* ] ),+
        ];
        match $crate::Matrix::from_rows(&rows) {
            Ok(m) => m,
            Err(err) => panic!("ragged matrix literal: {err}"),
        }
    }};
}

/// `rows * cols`, panicking when it overflows.
#[track_caller]
fn cell_count(rows: usize, cols: usize) -> usize {
    match Shape::new(rows, cols).checked_len() {
        Some(cells) => cells,
        None => panic!("{rows}x{cols} matrix is incompatible with usize cell indexing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_matrix_keeps_dimensions() {
        let m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.shape(), Shape::new(2, 3));
        assert_eq!(m.len(), 6);
    }

    #[test]
    #[should_panic(expected = "incompatible with 3 data elements")]
    fn new_matrix_rejects_wrong_length() {
        let _ = Matrix::new(2, 2, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn overflowing_shapes_are_rejected() {
        let rows = 1 << (usize::BITS - 1);
        assert_eq!(Shape::new(rows, 2).checked_len(), None);
        assert_eq!(
            Matrix::from_vec(rows, 2, vec![]),
            Err(MatrixError::ShapeOverflow { rows, cols: 2 })
        );
        assert!(std::panic::catch_unwind(|| Matrix::zeros(rows, 2)).is_err());
        assert!(std::panic::catch_unwind(|| Matrix::from_fn(rows, 2, |_, _| 0.0)).is_err());
        assert!(std::panic::catch_unwind(|| Shape::new(rows, 2).len()).is_err());
    }

    #[test]
    #[should_panic(expected = "incompatible with 0 data elements")]
    fn new_matrix_rejects_overflowing_shape() {
        let _ = Matrix::new(1 << (usize::BITS - 1), 2, vec![]);
    }

    #[test]
    fn from_vec_reports_wrong_length() {
        let err = Matrix::from_vec(2, 2, vec![1.0; 5]).unwrap_err();
        assert_eq!(
            err,
            MatrixError::DataLength {
                rows: 2,
                cols: 2,
                len: 5
            }
        );
    }

    #[test]
    fn get_and_set_use_row_major_offsets() {
        let mut m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.get(1, 1), 5.0);
        m.set(1, 1, 10.0);
        assert_eq!(m.get(1, 1), 10.0);
        assert_eq!(m.as_slice()[4], 10.0);
        m[(0, 2)] = -1.0;
        assert_eq!(m[(0, 2)], -1.0);
    }

    #[test]
    #[should_panic(expected = "index (2, 0) out of range for 2x3 matrix")]
    fn get_panics_past_last_row() {
        let m = Matrix::zeros(2, 3);
        let _ = m.get(2, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_panics_past_last_col() {
        // a column past the end must not wrap into the next row
        let mut m = Matrix::zeros(2, 3);
        m.set(0, 3, 1.0);
    }

    #[test]
    fn try_get_is_none_out_of_range() {
        let m = Matrix::zeros(2, 3);
        assert_eq!(m.try_get(1, 2), Some(0.0));
        assert_eq!(m.try_get(0, 3), None);
    }

    #[test]
    fn rows_round_trip() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let err = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, MatrixError::DimensionMismatch { op: "from_rows", .. }));
    }

    #[test]
    fn from_rows_empty_is_0x0() {
        let m = Matrix::from_rows::<Vec<f64>>(&[]).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.shape(), Shape::new(0, 0));
    }

    #[test]
    fn macro_builds_rows() {
        let m = crate::matrix![[1, 2, 3], [4, 5, 6]];
        assert_eq!(m.shape(), Shape::new(2, 3));
        assert_eq!(m.into_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "ragged matrix literal")]
    fn macro_rejects_ragged() {
        let _ = crate::matrix![[1.0, 2.0], [3.0]];
    }

    #[test]
    fn from_fn_fills_by_index() {
        let m = Matrix::from_fn(2, 2, |r, c| (r * 10 + c) as f64);
        assert_eq!(m.as_slice(), &[0.0, 1.0, 10.0, 11.0]);
    }
}
