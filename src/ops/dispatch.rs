//! Threshold policy and row partitioning.
//!
//! Every multi-row operation funnels through
//! [`Engine::for_each_row_chunk`]. It decides between:
//! 1. `Empty`: the output has no cells; nothing runs
//! 2. `Serial`: fewer than `parallel_threshold` elements; one kernel call on
//!    the calling thread
//! 3. `Parallel`: the output rows are cut into one contiguous chunk per
//!    worker and each chunk becomes a task on the configured backend
//!
//! # Design Highlights
//! - **Ownership by construction**: a [`RowChunk`] is a `&mut` window carved
//!   out of the output with `chunks_mut`; two chunks of one call can never
//!   overlap, so the compute loops need no locking
//! - **One kernel, two paths**: serial and parallel execution call the same
//!   kernel in the same per-cell order, so their results are bit-identical

use core::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use crate::backend::Backend;
use crate::engine::Engine;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;

/// How an operation was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The output had zero rows or zero columns.
    Empty,
    /// Ran on the calling thread.
    Serial,
    /// Ran as `tasks` row-chunk tasks.
    Parallel {
        /// Number of tasks the rows were split into.
        tasks: usize,
    },
}

impl Dispatch {
    /// Number of tasks handed to the backend.
    #[must_use]
    pub const fn tasks(self) -> usize {
        match self {
            Self::Empty | Self::Serial => 0,
            Self::Parallel { tasks } => tasks,
        }
    }

    /// Whether the operation ran in parallel.
    #[must_use]
    pub const fn is_parallel(self) -> bool {
        matches!(self, Self::Parallel { .. })
    }
}

/// Split of `rows` rows into contiguous chunks of `chunk_rows` rows.
///
/// `chunk_rows = ceil(rows / workers)`, so there are at most `workers`
/// chunks and only the last one may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPartition {
    rows: usize,
    chunk_rows: usize,
}

impl RowPartition {
    /// Partitions `rows` rows for `workers` workers. Zero workers counts as one.
    #[must_use]
    pub fn new(rows: usize, workers: usize) -> Self {
        let chunk_rows = rows.div_ceil(workers.max(1)).max(1);
        Self { rows, chunk_rows }
    }

    /// Rows per chunk.
    #[must_use]
    pub const fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    /// Number of chunks, zero when there are no rows.
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.rows.div_ceil(self.chunk_rows)
    }

    /// Row range of every chunk, in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + use<> {
        let Self { rows, chunk_rows } = *self;
        (0..rows)
            .step_by(chunk_rows)
            .map(move |start| start..(start + chunk_rows).min(rows))
    }

    /// Carves `data`, the buffer of a `rows x cols` matrix, into chunks.
    ///
    /// # Panics
    /// Panics if `cols` is zero or `data` is not `rows * cols` long.
    pub fn split<'a>(
        &self,
        data: &'a mut [f64],
        cols: usize,
    ) -> impl Iterator<Item = RowChunk<'a>> + use<'a> {
        assert!(cols > 0, "cannot partition rows of zero width");
        assert_eq!(data.len(), self.rows * cols, "buffer does not match partition");
        let chunk_rows = self.chunk_rows;
        data.chunks_mut(chunk_rows * cols)
            .enumerate()
            .map(move |(i, data)| RowChunk::new(i * chunk_rows, cols, data))
    }
}

/// Exclusive write access to rows `[start, end)` of an output matrix.
///
/// Only [`RowPartition::split`] and the serial path create chunks, so a task
/// holding one owns its rows outright.
#[derive(Debug)]
pub struct RowChunk<'a> {
    first_row: usize,
    cols: usize,
    data: &'a mut [f64],
}

impl<'a> RowChunk<'a> {
    pub(crate) fn new(first_row: usize, cols: usize, data: &'a mut [f64]) -> Self {
        debug_assert!(cols > 0 && data.len() % cols == 0);
        Self {
            first_row,
            cols,
            data,
        }
    }

    /// Absolute indices of the owned rows.
    #[must_use]
    pub fn rows(&self) -> Range<usize> {
        self.first_row..self.first_row + self.data.len() / self.cols
    }

    /// Width of every row.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Mutable access to owned row `row`, by absolute index.
    ///
    /// # Panics
    /// Panics if `row` is outside [`rows`](Self::rows).
    #[track_caller]
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let owned = self.rows();
        assert!(owned.contains(&row), "row {row} is not owned by chunk {owned:?}");
        let start = (row - self.first_row) * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Every owned row with its absolute index.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (usize, &mut [f64])> {
        let first = self.first_row;
        self.data
            .chunks_exact_mut(self.cols)
            .enumerate()
            .map(move |(i, row)| (first + i, row))
    }
}

impl Engine {
    /// Runs `kernel` over the rows of `out` under the engine's threshold
    /// policy.
    ///
    /// `work` is the element count compared against the threshold. The kernel
    /// may read anything it captures but can only write through the chunk it
    /// is given.
    ///
    /// # Errors
    /// - [`MatrixError::TaskFailed`] if the kernel panicked on a worker.
    /// - [`MatrixError::PoolStopped`] if the engine's pool was stopped.
    pub fn for_each_row_chunk<K>(
        &self,
        out: &mut Matrix,
        work: usize,
        kernel: K,
    ) -> Result<Dispatch>
    where
        K: Fn(RowChunk<'_>) + Sync,
    {
        let shape = out.shape();
        if shape.is_empty() {
            return Ok(Dispatch::Empty);
        }
        if work < self.config().parallel_threshold {
            tracing::trace!(%shape, work, "serial dispatch");
            kernel(RowChunk::new(0, shape.cols, out.as_mut_slice()));
            return Ok(Dispatch::Serial);
        }

        let partition = RowPartition::new(shape.rows, self.workers());
        let tasks = partition.chunk_count();
        let backend = self.config().backend;
        tracing::trace!(%shape, work, tasks, %backend, "parallel dispatch");

        let kernel = &kernel;
        match backend {
            Backend::Pool => {
                let chunks: Vec<RowChunk<'_>> =
                    partition.split(out.as_mut_slice(), shape.cols).collect();
                self.pool().scope(|s| {
                    for chunk in chunks {
                        s.spawn(move || kernel(chunk))?;
                    }
                    Ok::<(), MatrixError>(())
                })??;
            }
            Backend::Rayon => {
                let chunk_len = partition.chunk_rows() * shape.cols;
                let chunk_rows = partition.chunk_rows();
                let data = out.as_mut_slice();
                panic::catch_unwind(AssertUnwindSafe(|| {
                    data.par_chunks_mut(chunk_len)
                        .enumerate()
                        .for_each(|(i, rows)| {
                            kernel(RowChunk::new(i * chunk_rows, shape.cols, rows));
                        });
                }))
                .map_err(|_| {
                    tracing::error!(tasks, "row chunk panicked on rayon");
                    MatrixError::TaskFailed { failed: 1, total: tasks }
                })?;
            }
        }
        Ok(Dispatch::Parallel { tasks })
    }
}
