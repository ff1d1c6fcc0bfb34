use crate::habitat::StateMatrix;
use crate::linalg::DMatrix;

/// Returns the symmetric part of the provided matrix, i.e. (M + Mᵀ) / 2.
pub fn symmetrize(m: &StateMatrix) -> StateMatrix {
    0.5 * (m + m.transpose())
}

/// Returns the largest absolute difference between the matrix and its transpose.
pub fn asymmetry(m: &StateMatrix) -> f64 {
    (m - m.transpose()).amax()
}

/// Returns the smallest eigenvalue of the symmetric part of the matrix.
pub fn min_eigenvalue(m: &StateMatrix) -> f64 {
    symmetrize(m).symmetric_eigenvalues().min()
}

/// Returns whether the matrix is symmetric and positive semi-definite within `tol`.
///
/// The tolerance is relative to the largest diagonal element, so that covariances mixing
/// pascals and state of charge are compared on the same footing.
pub fn is_psd(m: &StateMatrix, tol: f64) -> bool {
    let scale = m.diagonal().amax().max(1.0);
    asymmetry(m) <= tol * scale && min_eigenvalue(m) >= -tol * scale
}

/// Condition number of a symmetric matrix from its eigenvalues.
///
/// Returns infinity if the smallest eigenvalue is not strictly positive.
pub fn condition_number(m: &DMatrix<f64>) -> f64 {
    let eigenvalues = m.clone().symmetric_eigenvalues();
    let min = eigenvalues.min();
    if min <= 0.0 || !min.is_finite() {
        f64::INFINITY
    } else {
        eigenvalues.max() / min
    }
}

/// Returns `num` evenly spaced values over [start, stop], both included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num < 2 {
        return vec![start; num];
    }
    let step = (stop - start) / (num - 1) as f64;
    (0..num)
        .map(|i| {
            if i == num - 1 {
                stop
            } else {
                start + step * i as f64
            }
        })
        .collect()
}

#[test]
fn test_linspace() {
    assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
    assert!(linspace(0.0, 1.0, 0).is_empty());
}

#[test]
fn test_psd() {
    let mut m = StateMatrix::identity();
    assert!(is_psd(&m, 1e-12));
    m[(0, 1)] = 1e-3;
    assert!(!is_psd(&m, 1e-12));
    assert!(is_psd(&symmetrize(&m), 1e-12));
    m = StateMatrix::identity();
    m[(3, 3)] = -1.0;
    assert!(!is_psd(&m, 1e-12));
    assert!((min_eigenvalue(&m) + 1.0).abs() < 1e-12);
}

#[test]
fn test_condition_number() {
    let m = DMatrix::from_diagonal(&crate::linalg::DVector::from_vec(vec![1.0, 4.0, 100.0]));
    assert!((condition_number(&m) - 100.0).abs() < 1e-9);
    let singular = DMatrix::<f64>::zeros(2, 2);
    assert!(condition_number(&singular).is_infinite());
}
