//! Error types for matrix operations and the worker pool.

use thiserror::Error;

use crate::matrix::Shape;

/// Result type for `briny_matrix` operations.
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Errors that can occur while building matrices, running operations or
/// driving the worker pool.
///
/// Out-of-range indexing is deliberately absent: it is a wiring bug between
/// layers and matrices and panics at the call site instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// Operands of a binary or product operation have incompatible shapes.
    #[error("{op}: dimension mismatch between {left} and {right}")]
    DimensionMismatch {
        /// Name of the operation.
        op: &'static str,
        /// Shape of the left operand.
        left: Shape,
        /// Shape of the right operand.
        right: Shape,
    },

    /// The caller-supplied output buffer does not have the result's shape.
    #[error("{op}: output must be {expected}, got {actual}")]
    OutputShapeMismatch {
        /// Name of the operation.
        op: &'static str,
        /// Shape the result requires.
        expected: Shape,
        /// Shape of the supplied output.
        actual: Shape,
    },

    /// `rows * cols` does not fit in `usize`.
    #[error("{rows}x{cols} matrix has more cells than usize can count")]
    ShapeOverflow {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// Backing data does not hold exactly `rows * cols` values.
    #[error("{rows}x{cols} matrix needs {} values, got {len}", .rows * .cols)]
    DataLength {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
        /// Length of the supplied data.
        len: usize,
    },

    /// Engine or pool configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A task was submitted after the pool was stopped.
    #[error("worker pool has been stopped")]
    PoolStopped,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// One or more tasks of a batch panicked.
    #[error("{failed} of {total} tasks failed")]
    TaskFailed {
        /// Tasks that panicked.
        failed: usize,
        /// Tasks that were part of the batch.
        total: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_error() {
        let err = MatrixError::DimensionMismatch {
            op: "add",
            left: Shape::new(2, 3),
            right: Shape::new(3, 2),
        };
        assert_eq!(err.to_string(), "add: dimension mismatch between 2x3 and 3x2");
    }

    #[test]
    fn test_output_shape_error() {
        let err = MatrixError::OutputShapeMismatch {
            op: "dot_product",
            expected: Shape::new(2, 2),
            actual: Shape::new(2, 3),
        };
        assert_eq!(err.to_string(), "dot_product: output must be 2x2, got 2x3");
    }

    #[test]
    fn test_shape_overflow_error() {
        let err = MatrixError::ShapeOverflow {
            rows: usize::MAX,
            cols: 2,
        };
        assert_eq!(
            err.to_string(),
            format!("{}x2 matrix has more cells than usize can count", usize::MAX)
        );
    }

    #[test]
    fn test_data_length_error() {
        let err = MatrixError::DataLength {
            rows: 2,
            cols: 2,
            len: 3,
        };
        assert_eq!(err.to_string(), "2x2 matrix needs 4 values, got 3");
    }

    #[test]
    fn test_task_failed_error() {
        let err = MatrixError::TaskFailed {
            failed: 1,
            total: 4,
        };
        assert_eq!(err.to_string(), "1 of 4 tasks failed");
    }
}
