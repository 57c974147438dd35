// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::marker::PhantomData;

use crate::error::ThreadSafeStdError;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput<F: 'static> {
    /// Eigenvalues, sorted in ascending order.
    pub eigenvalues: Array1<F>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<F>,
}

/// Trait for symmetric eigendecomposition (similar to LAPACK's DSYEVR or DSYEVD).
/// Implementers expect `matrix` to be symmetric and read its upper triangle.
pub trait BackendEigh<F: 'static + Copy + Send + Sync> {
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EighOutput<F>, ThreadSafeStdError>;
}

// --- NdarrayLinAlgBackend ---
use ndarray_linalg::{Eigh as NdLinalgEigh, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> ThreadSafeStdError {
    Box::new(e)
}

fn check_square<F>(matrix: &Array2<F>) -> Result<(), ThreadSafeStdError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(format!(
            "Matrix must be square for eigendecomposition, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        )
        .into());
    }
    Ok(())
}

impl BackendEigh<f64> for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, ThreadSafeStdError> {
        check_square(matrix)?;
        if matrix.is_empty() {
            return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
        }
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

// --- FaerLinAlgBackend ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{check_square, BackendEigh, EighOutput};
    use crate::error::ThreadSafeStdError;
    use ndarray::{Array1, Array2, ShapeBuilder};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_eigh_f64(matrix: &Array2<f64>) -> Result<EighOutput<f64>, ThreadSafeStdError> {
        check_square(matrix)?;
        let n = matrix.nrows();
        if n == 0 {
            return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
        }
        // faer reads column-major; copying through `from_fn` sidesteps ndarray layout checks.
        let faer_mat = faer::Mat::<f64>::from_fn(n, n, |i, j| matrix[[i, j]]);
        let eig = faer_mat
            .as_ref()
            .self_adjoint_eigen(faer::Side::Upper)
            .map_err(|e| -> ThreadSafeStdError { format!("Faer eigendecomposition failed: {:?}", e).into() })?;

        let s = eig.S().column_vector();
        let u = eig.U();
        let eigenvalues = Array1::from_shape_fn(n, |i| s[i]);
        let eigenvectors = Array2::from_shape_fn((n, n).f(), |(i, j)| u[(i, j)]);
        Ok(EighOutput { eigenvalues, eigenvectors })
    }

    impl BackendEigh<f64> for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, ThreadSafeStdError> {
            faer_eigh_f64(matrix)
        }
    }
}

// --- LinAlgBackendProvider Dispatch ---

/// A provider struct that dispatches to the selected linear algebra backend
/// based on compile-time feature flags.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

#[cfg(not(feature = "backend_faer"))]
impl<F> BackendEigh<F> for LinAlgBackendProvider<F>
where
    F: 'static + Copy + Send + Sync,
    NdarrayLinAlgBackend: BackendEigh<F>,
{
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EighOutput<F>, ThreadSafeStdError> {
        NdarrayLinAlgBackend.eigh_upper(matrix)
    }
}

#[cfg(feature = "backend_faer")]
impl<F> BackendEigh<F> for LinAlgBackendProvider<F>
where
    F: 'static + Copy + Send + Sync,
    faer_specific_code::FaerLinAlgBackend: BackendEigh<F>,
{
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EighOutput<F>, ThreadSafeStdError> {
        faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn eigh_returns_ascending_orthonormal_pairs() {
        let m = array![[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 5.0]];
        let out = LinAlgBackendProvider::<f64>::new().eigh_upper(&m).unwrap();

        assert_abs_diff_eq!(out.eigenvalues[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(out.eigenvalues[1], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(out.eigenvalues[2], 5.0, epsilon = 1e-10);

        let gram = out.eigenvectors.t().dot(&out.eigenvectors);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-10);
            }
        }

        for (k, &lambda) in out.eigenvalues.iter().enumerate() {
            let v = out.eigenvectors.column(k);
            let mv = m.dot(&v);
            for i in 0..3 {
                assert_abs_diff_eq!(mv[i], lambda * v[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn eigh_rejects_non_square_input() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(LinAlgBackendProvider::<f64>::new().eigh_upper(&m).is_err());
    }

    #[test]
    fn eigh_of_empty_matrix_is_empty() {
        let m = Array2::<f64>::zeros((0, 0));
        let out = NdarrayLinAlgBackend.eigh_upper(&m).unwrap();
        assert_eq!(out.eigenvalues.len(), 0);
        assert_eq!(out.eigenvectors.dim(), (0, 0));
    }
}
