//! Backend selection module.
//!
//! This module defines the executors a parallel operation can run on and
//! provides functions to set and get the process-wide default.
//!
//! # Supported Backends
//!
//! - `Pool`: the engine's own fixed [`WorkerPool`](crate::WorkerPool) (default).
//! - `Rayon`: rayon's global thread pool, fed the same row chunks.
//!
//! The default is stored globally using an `AtomicU8` and is only read when an
//! [`EngineConfig`](crate::EngineConfig) is defaulted; an engine never changes
//! backend after construction.

use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::MatrixError;

/// Enumeration of executors for above-threshold operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Backend {
    /// Row chunks are submitted to the engine's worker pool.
    #[default]
    Pool = 0,
    /// Row chunks are handed to `rayon::par_chunks_mut`.
    Rayon,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pool),
            1 => Ok(Self::Rayon),
            _ => Err(()),
        }
    }
}

impl FromStr for Backend {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pool" => Ok(Self::Pool),
            "rayon" => Ok(Self::Rayon),
            other => Err(MatrixError::InvalidConfig(format!("unknown backend `{other}`"))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pool => "pool",
            Self::Rayon => "rayon",
        })
    }
}

/// Internal global state for the default backend.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Pool as u8);

/// Sets the backend new default configurations pick up.
///
/// # Example
///
/// ```
/// use briny_matrix::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Rayon);
/// assert_eq!(get_backend(), Backend::Rayon);
/// set_backend(Backend::Pool);
/// ```
pub fn set_backend(b: Backend) {
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the current default backend.
///
/// If the stored value is invalid, defaults to [`Backend::Pool`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}
