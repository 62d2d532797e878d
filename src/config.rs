//! Engine configuration.
//!
//! The crossover point between serial and pool-parallel execution depends on
//! the hardware and the workload, so it is a runtime value on every engine
//! rather than a constant. [`EngineConfig::from_env`] lets a deployment tune it
//! without recompiling.

use std::thread;

use crate::backend::{get_backend, Backend};
use crate::error::{MatrixError, Result};

/// Default element count at which operations switch to parallel dispatch.
///
/// Equal to a 650x650 matrix.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 422_500;

/// Queue slots per worker when no capacity is configured.
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Environment variable overriding [`EngineConfig::parallel_threshold`].
pub const ENV_PARALLEL_THRESHOLD: &str = "BRINY_MATRIX_PARALLEL_THRESHOLD";
/// Environment variable overriding [`EngineConfig::workers`].
pub const ENV_WORKERS: &str = "BRINY_MATRIX_WORKERS";
/// Environment variable overriding [`EngineConfig::queue_capacity`].
pub const ENV_QUEUE_CAPACITY: &str = "BRINY_MATRIX_QUEUE_CAPACITY";
/// Environment variable overriding [`EngineConfig::backend`] (`pool` or `rayon`).
pub const ENV_BACKEND: &str = "BRINY_MATRIX_BACKEND";

/// Number of workers the hardware supports, falling back to 1.
#[must_use]
pub fn available_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Tunables of an [`Engine`](crate::Engine).
///
/// `workers` and `queue_capacity` are fixed once the engine's pool is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Operations touching at least this many elements run in parallel.
    pub parallel_threshold: usize,
    /// Number of pool workers, and the number of row chunks per operation.
    pub workers: usize,
    /// Bounded queue length; producers block while it is full.
    pub queue_capacity: usize,
    /// Executor for above-threshold operations.
    pub backend: Backend,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = available_workers();
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            workers,
            queue_capacity: workers * QUEUE_SLOTS_PER_WORKER,
            backend: get_backend(),
        }
    }
}

impl EngineConfig {
    /// Sets the parallel threshold.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets the worker count and resizes the queue to match it.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.queue_capacity = workers * QUEUE_SLOTS_PER_WORKER;
        self
    }

    /// Sets the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Checks that the configuration can drive an engine.
    ///
    /// # Errors
    /// [`MatrixError::InvalidConfig`] when any of the counts is zero.
    pub fn validate(&self) -> Result<()> {
        if self.parallel_threshold == 0 {
            return Err(MatrixError::InvalidConfig(
                "parallel_threshold must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(MatrixError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(MatrixError::InvalidConfig(
                "queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Reads overrides from the process environment on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup` on top of the defaults.
    ///
    /// Values that do not parse are ignored with a warning. Setting the worker
    /// count without a queue capacity sizes the queue from the new count.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(threshold) = parse_var(&lookup, ENV_PARALLEL_THRESHOLD) {
            cfg = cfg.with_parallel_threshold(threshold);
        }
        if let Some(workers) = parse_var(&lookup, ENV_WORKERS) {
            cfg = cfg.with_workers(workers);
        }
        if let Some(capacity) = parse_var(&lookup, ENV_QUEUE_CAPACITY) {
            cfg = cfg.with_queue_capacity(capacity);
        }
        if let Some(backend) = parse_var(&lookup, ENV_BACKEND) {
            cfg = cfg.with_backend(backend);
        }
        cfg
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
