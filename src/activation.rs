//! Activation functions for use with [`Engine::apply_function`] and
//! [`Engine::apply_rows`].
//!
//! ```rust
//! use briny_matrix::{activation, matrix, ops, Matrix};
//!
//! let z = matrix![[0.0, 1.0], [-1.0, 2.0]];
//! let mut a = Matrix::zeros(2, 2);
//! ops::apply_function(&z, activation::relu, &mut a).unwrap();
//! assert_eq!(a, matrix![[0.0, 1.0], [0.0, 2.0]]);
//! ```
//!
//! [`Engine::apply_function`]: crate::Engine::apply_function
//! [`Engine::apply_rows`]: crate::Engine::apply_rows

/// Logistic function `1 / (1 + e^-x)`.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of [`sigmoid`] expressed in terms of its output `s`.
///
/// Takes the activated value, not the pre-activation: `s * (1 - s)`.
#[must_use]
pub fn sigmoid_derivative(s: f64) -> f64 {
    s * (1.0 - s)
}

/// `max(0, x)`.
#[must_use]
pub fn relu(x: f64) -> f64 {
    if x > 0.0 { x } else { 0.0 }
}

/// Derivative of [`relu`]: 1 where `x > 0`, else 0.
#[must_use]
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

/// Normalized exponential of `input`, written to `out`.
///
/// The row maximum is subtracted before exponentiating so large inputs do not
/// overflow. An empty row is left empty.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn softmax_row(input: &[f64], out: &mut [f64]) {
    assert_eq!(input.len(), out.len(), "softmax row length mismatch");
    let max = input.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for (o, &x) in out.iter_mut().zip(input) {
        *o = (x - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
}

/// Allocating form of [`softmax_row`].
#[must_use]
pub fn softmax(input: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; input.len()];
    softmax_row(input, &mut out);
    out
}
