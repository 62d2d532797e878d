//! Row kernels.
//!
//! Each kernel fills the rows of one [`RowChunk`] from immutable inputs. The
//! dispatch layer calls them once with every row (serial) or once per chunk
//! (parallel); they never look outside the rows they were given.

use super::dispatch::RowChunk;
use crate::matrix::Matrix;

/// `out[i][j] = f(a[i][j], b[i][j])`.
pub(crate) fn zip_rows<F>(a: &Matrix, b: &Matrix, mut chunk: RowChunk<'_>, f: &F)
where
    F: Fn(f64, f64) -> f64,
{
    for (i, out) in chunk.rows_mut() {
        for ((o, &x), &y) in out.iter_mut().zip(a.row(i)).zip(b.row(i)) {
            *o = f(x, y);
        }
    }
}

/// `out[i][j] = f(a[i][j])`.
pub(crate) fn map_rows<F>(a: &Matrix, mut chunk: RowChunk<'_>, f: &F)
where
    F: Fn(f64) -> f64,
{
    for (i, out) in chunk.rows_mut() {
        for (o, &x) in out.iter_mut().zip(a.row(i)) {
            *o = f(x);
        }
    }
}

/// `f(a[i], out[i])` for whole rows.
pub(crate) fn with_rows<F>(a: &Matrix, mut chunk: RowChunk<'_>, f: &F)
where
    F: Fn(&[f64], &mut [f64]),
{
    for (i, out) in chunk.rows_mut() {
        f(a.row(i), out);
    }
}

/// `out[i][j] = sum_k a[i][k] * b[k][j]`.
///
/// Walks `k` in the middle loop so both `b` and `out` are read along rows;
/// the sum for each cell still accumulates in ascending `k`.
pub(crate) fn matmul_rows(a: &Matrix, b: &Matrix, mut chunk: RowChunk<'_>) {
    for (i, out) in chunk.rows_mut() {
        out.fill(0.0);
        for (k, &aik) in a.row(i).iter().enumerate() {
            for (o, &bkj) in out.iter_mut().zip(b.row(k)) {
                *o += aik * bkj;
            }
        }
    }
}

/// `out[j][i] = a[i][j]`; the chunk holds rows of the transposed output.
pub(crate) fn transpose_rows(a: &Matrix, mut chunk: RowChunk<'_>) {
    let src = a.as_slice();
    let stride = a.cols();
    for (j, out) in chunk.rows_mut() {
        for (i, o) in out.iter_mut().enumerate() {
            *o = src[i * stride + j];
        }
    }
}
