//! # Operation Layer
//!
//! Free-function form of the operation set, running on
//! [`Engine::global`]. Network layers that do not carry an engine around call
//! these directly.
//!
//! ## Submodules
//!
//! - [`dispatch`]: threshold policy, row partitioning and the [`RowChunk`]
//!   ownership type
//! - `cpu`: the row kernels shared by the serial and parallel paths
//!
//! ## Example
//!
//! ```rust
//! use briny_matrix::{matrix, ops, Matrix};
//!
//! let c = matrix![[1.0, 2.0], [3.0, 4.0]];
//! let d = matrix![[5.0, 6.0], [7.0, 8.0]];
//! let mut out = Matrix::zeros(2, 2);
//! ops::multiply_elementwise(&c, &d, &mut out).unwrap();
//! assert_eq!(out, matrix![[5.0, 12.0], [21.0, 32.0]]);
//! ```
//!
//! ## Notes
//!
//! - Outputs are borrowed mutably and inputs immutably, so an operation can
//!   never write into one of its own inputs
//! - [`transpose`] is the only operation that allocates

pub(crate) mod cpu;
pub mod dispatch;

pub use self::dispatch::{Dispatch, RowChunk, RowPartition};

use crate::engine::Engine;
use crate::error::Result;
use crate::matrix::Matrix;

/// `out = a + b` on the global engine. See [`Engine::add`].
///
/// # Errors
/// As [`Engine::add`].
pub fn add(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
    Engine::global().add(a, b, out)
}

/// `out = a - b` on the global engine. See [`Engine::subtract`].
///
/// # Errors
/// As [`Engine::subtract`].
pub fn subtract(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
    Engine::global().subtract(a, b, out)
}

/// Cell-wise product on the global engine. See [`Engine::multiply_elementwise`].
///
/// # Errors
/// As [`Engine::multiply_elementwise`].
pub fn multiply_elementwise(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
    Engine::global().multiply_elementwise(a, b, out)
}

/// `out = a * scalar` on the global engine.
///
/// # Errors
/// As [`Engine::multiply_scalar`].
pub fn multiply_scalar(a: &Matrix, scalar: f64, out: &mut Matrix) -> Result<Dispatch> {
    Engine::global().multiply_scalar(a, scalar, out)
}

/// `out[i][j] = f(a[i][j])` on the global engine.
///
/// # Errors
/// As [`Engine::apply_function`].
pub fn apply_function<F>(a: &Matrix, f: F, out: &mut Matrix) -> Result<Dispatch>
where
    F: Fn(f64) -> f64 + Sync,
{
    Engine::global().apply_function(a, f, out)
}

/// Row-wise transform on the global engine.
///
/// # Errors
/// As [`Engine::apply_rows`].
pub fn apply_rows<F>(a: &Matrix, f: F, out: &mut Matrix) -> Result<Dispatch>
where
    F: Fn(&[f64], &mut [f64]) + Sync,
{
    Engine::global().apply_rows(a, f, out)
}

/// Matrix product on the global engine.
///
/// # Errors
/// As [`Engine::dot_product`].
pub fn dot_product(a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
    Engine::global().dot_product(a, b, out)
}

/// Newly allocated transpose on the global engine.
///
/// # Errors
/// As [`Engine::transpose`].
pub fn transpose(a: &Matrix) -> Result<Matrix> {
    Engine::global().transpose(a)
}
