// src/zerosum.rs

//! Zero-sum constraint for GP bases.
//!
//! A Householder reflection `Q` maps `e_1` onto the normalized all-ones vector,
//! so in the rotated frame the first coordinate carries the mean along the time
//! axis. Dropping that coordinate and rotating back gives the projector
//! `P = Q^T D Q = I - 11^T / n`; a covariance sandwiched as `P C P` describes a
//! process whose realizations sum to zero over the time points.

use ndarray::{Array1, Array2};

/// Builds a Householder transformation matrix that maps `e_1` to a vector of all
/// `1/sqrt(n)`.
///
/// The reflection is symmetric and orthogonal. For `n = 1` the two vectors
/// coincide and the identity is returned.
pub fn make_sum_zero_hh(n: usize) -> Array2<f64> {
    if n == 0 {
        return Array2::zeros((0, 0));
    }
    let mut v = Array1::from_elem(n, -1.0 / (n as f64).sqrt());
    v[0] += 1.0;
    let norm = v.dot(&v).sqrt();
    if norm <= f64::EPSILON {
        return Array2::eye(n);
    }
    v /= norm;

    let mut hh = Array2::<f64>::eye(n);
    for i in 0..n {
        for j in 0..n {
            hh[[i, j]] -= 2.0 * v[i] * v[j];
        }
    }
    hh
}

/// Orthogonal projector onto the zero-sum subspace, `Q^T D Q` with
/// `D = diag(0, 1, ..., 1)`.
pub fn zero_sum_projector(n: usize) -> Array2<f64> {
    let q = make_sum_zero_hh(n);
    let mut dq = q.clone();
    if n > 0 {
        dq.row_mut(0).fill(0.0);
    }
    q.t().dot(&dq)
}

/// Projects a covariance onto the zero-sum subspace: `P C P`.
///
/// The result is re-symmetrized so the eigen backend, which only reads one
/// triangle, sees exactly the matrix that was intended.
pub fn project_zero_sum(cov: &Array2<f64>) -> Array2<f64> {
    let p = zero_sum_projector(cov.nrows());
    let projected = p.dot(cov).dot(&p);
    let symmetric = (&projected + &projected.t()) * 0.5;
    log::trace!("Projected {:?} covariance onto the zero-sum subspace.", cov.dim());
    symmetric
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};

    #[test]
    fn householder_maps_e1_to_normalized_ones() {
        let n = 5;
        let q = make_sum_zero_hh(n);
        let first_column = q.column(0);
        for &value in first_column.iter() {
            assert_abs_diff_eq!(value, 1.0 / (n as f64).sqrt(), epsilon = 1e-12);
        }
    }

    #[test]
    fn householder_is_symmetric_and_orthogonal() {
        let q = make_sum_zero_hh(7);
        let qtq = q.t().dot(&q);
        for i in 0..7 {
            for j in 0..7 {
                assert_abs_diff_eq!(q[[i, j]], q[[j, i]], epsilon = 1e-12);
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(qtq[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn single_point_reflection_is_identity() {
        assert_eq!(make_sum_zero_hh(1), array![[1.0]]);
        assert_eq!(make_sum_zero_hh(0).dim(), (0, 0));
    }

    #[test]
    fn projector_equals_centering_matrix() {
        let n = 6;
        let p = zero_sum_projector(n);
        for i in 0..n {
            for j in 0..n {
                let expected = (if i == j { 1.0 } else { 0.0 }) - 1.0 / n as f64;
                assert_abs_diff_eq!(p[[i, j]], expected, epsilon = 1e-12);
            }
        }
        // Idempotent.
        let pp = p.dot(&p);
        for (a, b) in pp.iter().zip(p.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn projected_covariance_rows_and_columns_sum_to_zero() {
        let cov = array![
            [2.0, 0.5, 0.1, 0.0],
            [0.5, 1.5, 0.3, 0.2],
            [0.1, 0.3, 1.0, 0.4],
            [0.0, 0.2, 0.4, 3.0]
        ];
        let projected = project_zero_sum(&cov);
        for s in projected.sum_axis(Axis(0)).iter() {
            assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-12);
        }
        for s in projected.sum_axis(Axis(1)).iter() {
            assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-12);
        }
    }
}
