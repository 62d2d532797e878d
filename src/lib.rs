//! # `briny_matrix`
//!
//! A dense row-major `f64` matrix engine for feedforward network passes.
//! Operations write into caller-owned output buffers and switch from serial
//! to row-chunked parallel execution once an input reaches a configurable
//! element count.
//!
//! ## Features
//!
//! - **Matrix**: flat row-major storage with bounds-checked access
//! - **Operations**: add, subtract, element-wise and scalar products, matrix
//!   product, transpose, per-cell and per-row functions
//! - **Dispatch**: threshold policy splitting output rows into one disjoint
//!   chunk per worker
//! - **Worker pool**: fixed threads, bounded queue with backpressure,
//!   per-batch completion and panic reporting
//!
//! ## Modules
//!
//! - [`matrix`]: [`Matrix`], [`Shape`] and the [`matrix!`] macro
//! - [`engine`]: [`Engine`], the operation set
//! - [`ops`]: the operation set on the global engine, plus dispatch types
//! - [`pool`]: [`WorkerPool`] and its batches
//! - [`config`] / [`backend`]: tunables and executor choice
//! - [`activation`]: functions to feed [`Engine::apply_function`]
//! - [`approx`]: graded float comparison
//!
//! ## Example
//!
//! ```rust
//! use briny_matrix::{activation, matrix, Engine, EngineConfig, Matrix};
//!
//! let engine = Engine::new(EngineConfig::default().with_workers(2)).unwrap();
//! let weights = matrix![[0.5, -0.5], [0.25, 0.75]];
//! let input = matrix![[1.0], [2.0]];
//! let bias = matrix![[0.1], [0.2]];
//!
//! let mut z = Matrix::zeros(2, 1);
//! let mut a = Matrix::zeros(2, 1);
//! engine.dot_product(&weights, &input, &mut z).unwrap();
//! let zb = z.clone();
//! engine.add(&zb, &bias, &mut z).unwrap();
//! engine.apply_function(&z, activation::sigmoid, &mut a).unwrap();
//! assert!(a.get(0, 0) < 0.5 && a.get(1, 0) > 0.5);
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::similar_names,
    clippy::many_single_char_names
)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod activation;
pub mod approx;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod ops;
pub mod pool;

pub use crate::backend::Backend;
pub use crate::config::{EngineConfig, DEFAULT_PARALLEL_THRESHOLD};
pub use crate::engine::Engine;
pub use crate::error::{MatrixError, Result};
pub use crate::matrix::{Matrix, Shape};
pub use crate::ops::Dispatch;
pub use crate::pool::{Batch, Scope, WorkerPool, WorkerState};
