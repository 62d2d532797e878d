//! Utilities to approximate equality of floating point values.
//!
//! Serial and parallel dispatch run the same kernels, so their results are
//! expected to land in [`ApproxEquality::Precise`]; the looser grades exist for
//! callers comparing against hand-computed references.

use crate::matrix::Matrix;

/// The max epsilon accepted on `f64`s.
pub const F64_MAX_ERROR: f64 = 1e-3;

/// The expected minimum epsilon accepted on `f64`s.
pub const F64_AVG_ERROR: f64 = 1e-6;

/// The best expected epsilon accepted on `f64`s.
pub const F64_MIN_ERROR: f64 = 1e-9;

/// Checks the absolute distance against the epsilon grades.
pub trait RelativeEq<Rhs: ?Sized> {
    /// Grades the equality of `self` and `rhs`.
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

impl RelativeEq<Self> for f64 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        let dif = (self - rhs).abs();

        if dif < F64_MIN_ERROR {
            ApproxEquality::Precise
        } else if dif < F64_AVG_ERROR {
            ApproxEquality::Partial
        } else if dif < F64_MAX_ERROR {
            ApproxEquality::Relative
        } else {
            // also covers NaN, whose difference never compares below anything
            ApproxEquality::Scarce
        }
    }
}

impl RelativeEq<Self> for [f64] {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        self.iter()
            .zip(rhs)
            .map(|(a, b)| a.approx_eq(b))
            .max()
            .unwrap_or(ApproxEquality::Precise)
    }
}

impl RelativeEq<Self> for Matrix {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.shape() != rhs.shape() {
            return ApproxEquality::Scarce;
        }
        self.as_slice().approx_eq(rhs.as_slice())
    }
}

/// The approximated equality enumerated, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Within [`F64_MIN_ERROR`].
    Precise = 0,

    /// Within [`F64_AVG_ERROR`].
    Partial = 1,

    /// Within [`F64_MAX_ERROR`].
    Relative = 2,

    /// No relative equality.
    Scarce = 3,
}

/// Returns `true` when `a` and `b` are [`ApproxEquality::Precise`].
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    a.approx_eq(b) == ApproxEquality::Precise
}
