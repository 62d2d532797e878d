//! The matrix engine: operation set on top of the dispatch policy.
//!
//! An [`Engine`] pairs an [`EngineConfig`] with a [`WorkerPool`]. Every
//! operation validates shapes first, so a failed call leaves `out` exactly as
//! it was, then hands a row kernel to
//! [`for_each_row_chunk`](Engine::for_each_row_chunk).
//!
//! ## Example
//!
//! ```rust
//! use briny_matrix::{matrix, Engine, EngineConfig, Matrix};
//!
//! let engine = Engine::new(EngineConfig::default().with_workers(2)).unwrap();
//! let a = matrix![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
//! let b = matrix![[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]];
//! let mut out = Matrix::zeros(2, 2);
//! engine.dot_product(&a, &b, &mut out).unwrap();
//! assert_eq!(out, matrix![[58.0, 64.0], [139.0, 154.0]]);
//! ```

use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::instrument;

use crate::config::EngineConfig;
use crate::error::{MatrixError, Result};
use crate::matrix::{Matrix, Shape};
use crate::ops::cpu;
use crate::ops::dispatch::Dispatch;
use crate::pool::WorkerPool;

lazy_static! {
    static ref GLOBAL_ENGINE: Engine = Engine::new(EngineConfig::from_env())
        .or_else(|err| {
            tracing::warn!(%err, "environment configuration rejected, using defaults");
            Engine::new(EngineConfig::default())
        })
        .unwrap_or_else(|err| panic!("failed to start the global matrix engine: {err}"));
}

/// Dense matrix operations with threshold-based parallel dispatch.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    pool: Arc<WorkerPool>,
}

impl Engine {
    /// Validates `config` and starts a pool of `config.workers` workers.
    ///
    /// # Errors
    /// [`MatrixError::InvalidConfig`] or [`MatrixError::Spawn`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers, config.queue_capacity)?;
        Ok(Self {
            config,
            pool: Arc::new(pool),
        })
    }

    /// Builds an engine on an existing pool. The pool's worker count and
    /// queue capacity replace the ones in `config`.
    ///
    /// # Errors
    /// [`MatrixError::InvalidConfig`] if the threshold is zero.
    pub fn with_pool(config: EngineConfig, pool: Arc<WorkerPool>) -> Result<Self> {
        let config = EngineConfig {
            workers: pool.worker_count(),
            queue_capacity: pool.queue_capacity(),
            ..config
        };
        config.validate()?;
        Ok(Self { config, pool })
    }

    /// The process-wide engine, started on first use from
    /// [`EngineConfig::from_env`].
    ///
    /// # Panics
    /// Panics on first use if no worker thread can be spawned.
    pub fn global() -> &'static Self {
        &GLOBAL_ENGINE
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The pool parallel operations run on.
    #[must_use]
    pub const fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Number of row chunks a parallel operation is split into at most.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.worker_count()
    }

    /// Stops the pool. Operations that would run in parallel fail with
    /// [`MatrixError::PoolStopped`] afterwards; serial ones keep working.
    pub fn shutdown(&self) {
        self.pool.stop();
    }

    /// `out = a + b`, cell by cell.
    ///
    /// # Errors
    /// [`MatrixError::DimensionMismatch`] if `a` and `b` differ in shape,
    /// [`MatrixError::OutputShapeMismatch`] if `out` does not match them.
    pub fn add(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
        self.zip_with("add", a, b, out, |x, y| x + y)
    }

    /// `out = a - b`, cell by cell.
    ///
    /// # Errors
    /// As [`add`](Self::add).
    pub fn subtract(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
        self.zip_with("subtract", a, b, out, |x, y| x - y)
    }

    /// `out = a * b`, cell by cell (Hadamard product).
    ///
    /// # Errors
    /// As [`add`](Self::add).
    pub fn multiply_elementwise(
        &self,
        a: &Matrix,
        b: &Matrix,
        out: &mut Matrix,
    ) -> Result<Dispatch> {
        self.zip_with("multiply_elementwise", a, b, out, |x, y| x * y)
    }

    fn zip_with<F>(
        &self,
        op: &'static str,
        a: &Matrix,
        b: &Matrix,
        out: &mut Matrix,
        f: F,
    ) -> Result<Dispatch>
    where
        F: Fn(f64, f64) -> f64 + Sync,
    {
        same_shape(op, a, b)?;
        output_shape(op, a.shape(), out)?;
        self.for_each_row_chunk(out, a.len(), |chunk| cpu::zip_rows(a, b, chunk, &f))
    }

    /// `out = a * scalar`.
    ///
    /// # Errors
    /// [`MatrixError::OutputShapeMismatch`] if `out` does not match `a`.
    pub fn multiply_scalar(&self, a: &Matrix, scalar: f64, out: &mut Matrix) -> Result<Dispatch> {
        self.apply_function(a, move |x| x * scalar, out)
    }

    /// `out[i][j] = f(a[i][j])`.
    ///
    /// `f` may run on several workers at once.
    ///
    /// # Errors
    /// [`MatrixError::OutputShapeMismatch`] if `out` does not match `a`.
    pub fn apply_function<F>(&self, a: &Matrix, f: F, out: &mut Matrix) -> Result<Dispatch>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        output_shape("apply_function", a.shape(), out)?;
        self.for_each_row_chunk(out, a.len(), |chunk| cpu::map_rows(a, chunk, &f))
    }

    /// `f(a.row(i), out.row_mut(i))` for every row, for transforms that need
    /// the whole row such as [`softmax_row`](crate::activation::softmax_row).
    ///
    /// # Errors
    /// [`MatrixError::OutputShapeMismatch`] if `out` does not match `a`.
    pub fn apply_rows<F>(&self, a: &Matrix, f: F, out: &mut Matrix) -> Result<Dispatch>
    where
        F: Fn(&[f64], &mut [f64]) + Sync,
    {
        output_shape("apply_rows", a.shape(), out)?;
        self.for_each_row_chunk(out, a.len(), |chunk| cpu::with_rows(a, chunk, &f))
    }

    /// Matrix product `out = a × b`.
    ///
    /// # Errors
    /// [`MatrixError::DimensionMismatch`] if `a.cols() != b.rows()`,
    /// [`MatrixError::OutputShapeMismatch`] if `out` is not
    /// `a.rows() x b.cols()`.
    #[instrument(level = "trace", skip_all, fields(a = %a.shape(), b = %b.shape()))]
    pub fn dot_product(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
        if a.cols() != b.rows() {
            return Err(MatrixError::DimensionMismatch {
                op: "dot_product",
                left: a.shape(),
                right: b.shape(),
            });
        }
        output_shape("dot_product", Shape::new(a.rows(), b.cols()), out)?;
        self.for_each_row_chunk(out, a.len(), |chunk| cpu::matmul_rows(a, b, chunk))
    }

    /// Returns a newly allocated transpose of `a`.
    ///
    /// # Errors
    /// Only the pool errors of [`for_each_row_chunk`](Self::for_each_row_chunk).
    #[instrument(level = "trace", skip_all, fields(a = %a.shape()))]
    pub fn transpose(&self, a: &Matrix) -> Result<Matrix> {
        let mut out = Matrix::zeros(a.cols(), a.rows());
        self.for_each_row_chunk(&mut out, a.len(), |chunk| cpu::transpose_rows(a, chunk))?;
        Ok(out)
    }

    /// Writes the transpose of `a` into `out`.
    ///
    /// # Errors
    /// [`MatrixError::OutputShapeMismatch`] if `out` is not
    /// `a.cols() x a.rows()`.
    pub fn transpose_into(&self, a: &Matrix, out: &mut Matrix) -> Result<Dispatch> {
        output_shape("transpose", Shape::new(a.cols(), a.rows()), out)?;
        self.for_each_row_chunk(out, a.len(), |chunk| cpu::transpose_rows(a, chunk))
    }
}

fn same_shape(op: &'static str, a: &Matrix, b: &Matrix) -> Result<()> {
    if a.shape() == b.shape() {
        Ok(())
    } else {
        Err(MatrixError::DimensionMismatch {
            op,
            left: a.shape(),
            right: b.shape(),
        })
    }
}

fn output_shape(op: &'static str, expected: Shape, out: &Matrix) -> Result<()> {
    if out.shape() == expected {
        Ok(())
    } else {
        Err(MatrixError::OutputShapeMismatch {
            op,
            expected,
            actual: out.shape(),
        })
    }
}
