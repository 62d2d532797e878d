use briny_matrix::approx::approx_eq;
use briny_matrix::*;
use rand::Rng;

fn random_matrix(rows: usize, cols: usize) -> Matrix {
    let mut rng = rand::rng();
    Matrix::from_fn(rows, cols, |_, _| rng.random_range(-10.0..10.0))
}

#[test]
fn test_matrix_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Matrix::new(2, 2, vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_index_out_of_range_panics() {
    let m = Matrix::zeros(2, 3);
    let result = std::panic::catch_unwind(|| m.get(0, 3));
    assert!(result.is_err());
}

#[test]
fn test_dot_product_example() {
    let a = matrix![[1, 2, 3], [4, 5, 6]];
    let b = matrix![[7, 8], [9, 10], [11, 12]];
    let mut out = Matrix::zeros(2, 2);
    ops::dot_product(&a, &b, &mut out).unwrap();
    assert_eq!(out, matrix![[58, 64], [139, 154]]);
}

#[test]
fn test_elementwise_example() {
    let c = matrix![[1, 2], [3, 4]];
    let d = matrix![[5, 6], [7, 8]];
    let mut out = Matrix::zeros(2, 2);
    ops::multiply_elementwise(&c, &d, &mut out).unwrap();
    assert_eq!(out, matrix![[5, 12], [21, 32]]);
}

#[test]
fn test_transpose_example() {
    let a = matrix![[1, 2, 3], [4, 5, 6]];
    assert_eq!(ops::transpose(&a).unwrap(), matrix![[1, 4], [2, 5], [3, 6]]);
}

#[test]
fn test_add_mismatch_leaves_output_bit_identical() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(3, 2);
    let mut out = random_matrix(2, 3);
    let before: Vec<u64> = out.as_slice().iter().map(|x| x.to_bits()).collect();

    let err = ops::add(&a, &b, &mut out).unwrap_err();
    assert!(matches!(err, MatrixError::DimensionMismatch { .. }));

    let after: Vec<u64> = out.as_slice().iter().map(|x| x.to_bits()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_forward_pass_shape() {
    // weights (3x2) . input (2x1) + bias (3x1), then sigmoid
    let weights = random_matrix(3, 2);
    let input = matrix![[0.0], [1.0]];
    let bias = random_matrix(3, 1);
    let mut z = Matrix::zeros(3, 1);
    let mut zb = Matrix::zeros(3, 1);
    let mut a = Matrix::zeros(3, 1);

    ops::dot_product(&weights, &input, &mut z).unwrap();
    ops::add(&z, &bias, &mut zb).unwrap();
    ops::apply_function(&zb, activation::sigmoid, &mut a).unwrap();

    for row in 0..3 {
        let expected = activation::sigmoid(weights.get(row, 1) + bias.get(row, 0));
        assert!(approx_eq(&a.get(row, 0), &expected));
    }
}

#[test]
fn test_backward_pass_update() {
    // w -= lr * (delta . input^T)
    let delta = matrix![[0.5], [-1.0]];
    let input = matrix![[2.0], [4.0]];
    let weights = matrix![[1.0, 1.0], [1.0, 1.0]];

    let input_t = ops::transpose(&input).unwrap();
    let mut grad = Matrix::zeros(2, 2);
    let mut step = Matrix::zeros(2, 2);
    let mut updated = Matrix::zeros(2, 2);
    ops::dot_product(&delta, &input_t, &mut grad).unwrap();
    ops::multiply_scalar(&grad, 0.1, &mut step).unwrap();
    ops::subtract(&weights, &step, &mut updated).unwrap();

    let expected = matrix![[0.9, 0.8], [1.2, 1.4]];
    assert!(approx_eq(&updated, &expected));
}

#[test]
fn test_row_softmax() {
    let logits = matrix![[1.0, 1.0], [0.0, 100.0]];
    let mut probs = Matrix::zeros(2, 2);
    ops::apply_rows(&logits, activation::softmax_row, &mut probs).unwrap();
    assert!(approx_eq(probs.row(0), &[0.5, 0.5][..]));
    assert!(probs.get(1, 1) > 0.999);
}

#[test]
fn test_nested_rows_round_trip() {
    let a = random_matrix(3, 4);
    let rows = a.to_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(Matrix::from_rows(&rows).unwrap(), a);
}
