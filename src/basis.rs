// src/basis.rs

//! Reduced-rank GP basis from the eigendecomposition of a kernel matrix.
//!
//! Given the covariance `K` of a GP evaluated at `n` time points, the
//! eigendecomposition `K = V diag(lambda) V^T` yields basis functions
//! `phi_j = sqrt(lambda_j) v_j`. A latent effect `f = Phi beta` with
//! `beta ~ N(0, I)` then has covariance `Phi Phi^T`, which approaches `K` as more
//! eigenpairs are kept. Keeping only the leading eigenpairs that explain
//! `variance_limit` of the total variance gives a cheap approximation.

use log::{debug, info, trace, warn};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{GpConfig, KernelKind};
use crate::error::GpBasisError;
use crate::kernel::Kernel;
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};
use crate::time_axis::TimeAxis;
use crate::zerosum::project_zero_sum;

/// A truncated GP basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpBasis {
    /// Basis functions as columns, `sqrt(lambda_j) * v_j`.
    /// Shape: `(n_points, n_basis)`, ordered by ascending eigenvalue.
    pub(crate) basis: Array2<f64>,
    /// Eigenvalues of the kept eigenpairs, ascending.
    /// Shape: `(n_basis)`
    pub(crate) eigenvalues: Array1<f64>,
    /// Sum of the non-negative spectrum before variance truncation.
    pub(crate) total_variance: f64,
    pub(crate) kernel: KernelKind,
    pub(crate) zerosum: bool,
}

impl GpBasis {
    /// The basis matrix, shape `(n_points, n_basis)`.
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    pub fn into_basis(self) -> Array2<f64> {
        self.basis
    }

    /// Kept eigenvalues, ascending, one per basis column.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    pub fn is_zerosum(&self) -> bool {
        self.zerosum
    }

    pub fn n_basis(&self) -> usize {
        self.basis.ncols()
    }

    pub fn n_points(&self) -> usize {
        self.basis.nrows()
    }

    /// Share of the total variance carried by the kept eigenpairs.
    pub fn explained_variance_ratio(&self) -> f64 {
        if self.total_variance > 0.0 {
            self.eigenvalues.sum() / self.total_variance
        } else {
            0.0
        }
    }

    /// `Phi Phi^T`, the covariance implied by the truncated basis.
    pub fn reconstruct_covariance(&self) -> Array2<f64> {
        self.basis.dot(&self.basis.t())
    }
}

/// Eigenpairs left after the precision cutoff and variance truncation.
#[derive(Debug, Clone)]
pub struct TruncatedSpectrum {
    /// Ascending.
    pub eigenvalues: Array1<f64>,
    /// Columns match `eigenvalues`.
    pub eigenvectors: Array2<f64>,
    /// Sum of the eigenvalues that survived the precision cutoff.
    pub total_variance: f64,
    /// Eigenvalues discarded for being negative (or below a negative one).
    pub n_precision_dropped: usize,
}

fn validate_variance_limit(variance_limit: f64) -> Result<(), GpBasisError> {
    if !(variance_limit.is_finite() && variance_limit > 0.0 && variance_limit <= 1.0) {
        return Err(GpBasisError::InvalidConfig(format!(
            "`variance_limit` must be in (0, 1], got {}.",
            variance_limit
        )));
    }
    Ok(())
}

/// Drops numerically unusable eigenpairs and truncates by explained variance.
///
/// `eigenvalues` must be ascending with matching eigenvector columns, as
/// returned by a symmetric eigensolver.
///
/// 1. Scanning down from the largest eigenvalue, everything from the first
///    negative (or NaN) eigenvalue downward is discarded. Negative eigenvalues
///    of a PSD kernel are rounding noise.
/// 2. With `variance_limit == 1` every remaining eigenpair is kept. Otherwise the
///    `k` largest are kept, where `k` is the smallest count whose cumulative share
///    of the remaining spectrum strictly exceeds `variance_limit`.
pub fn truncate_spectrum(
    eigenvalues: &Array1<f64>,
    eigenvectors: &Array2<f64>,
    variance_limit: f64,
) -> Result<TruncatedSpectrum, GpBasisError> {
    validate_variance_limit(variance_limit)?;
    let n = eigenvalues.len();
    if eigenvectors.ncols() != n {
        return Err(GpBasisError::InvalidInput(format!(
            "{} eigenvalues but {} eigenvector columns.",
            n,
            eigenvectors.ncols()
        )));
    }

    let n_usable = eigenvalues.iter().rev().take_while(|&&v| v >= 0.0).count();
    let n_precision_dropped = n - n_usable;
    let usable_start = n - n_usable;
    let usable_vals = eigenvalues.slice(s![usable_start..]);
    let total_variance = usable_vals.sum();

    if n_usable == 0 || !(total_variance > 0.0) {
        return Err(GpBasisError::DegenerateSpectrum(format!(
            "no positive eigenvalue among {} (largest = {}).",
            n,
            eigenvalues.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        )));
    }
    if n_precision_dropped > 0 {
        debug!(
            "Precision cutoff dropped {} of {} eigenvalues (smallest dropped = {:e}).",
            n_precision_dropped, n, eigenvalues[0]
        );
    }
    if n_precision_dropped * 2 > n {
        warn!(
            "More than half of the spectrum ({} of {}) was discarded as numerically negative.",
            n_precision_dropped, n
        );
    }

    let n_keep = if variance_limit == 1.0 {
        n_usable
    } else {
        let mut cumulative = 0.0;
        let mut crossing = None;
        for (rank, &v) in usable_vals.iter().rev().enumerate() {
            cumulative += v;
            if cumulative / total_variance > variance_limit {
                crossing = Some(rank + 1);
                break;
            }
        }
        crossing.unwrap_or(n_usable)
    };

    let keep_start = n - n_keep;
    trace!(
        "Keeping eigenpairs {}..{} of {} (variance_limit = {}).",
        keep_start, n, n, variance_limit
    );
    Ok(TruncatedSpectrum {
        eigenvalues: eigenvalues.slice(s![keep_start..]).to_owned(),
        eigenvectors: eigenvectors.slice(s![.., keep_start..]).to_owned(),
        total_variance,
        n_precision_dropped,
    })
}

/// Decomposes the GP described by `config` into a truncated basis over `time`.
///
/// Builds the kernel covariance, optionally projects it onto the zero-sum
/// subspace, eigendecomposes it, and keeps the leading eigenpairs according to
/// `config.variance_limit` (see [`truncate_spectrum`]). The returned basis has
/// one column `sqrt(lambda_j) * v_j` per kept eigenpair, smallest eigenvalue
/// first.
///
/// # Errors
/// Configuration errors from [`Kernel::from_config`], unit and input errors
/// from the time axis, `InvalidConfig` for a `variance_limit` outside (0, 1],
/// `Decomposition` if the eigensolver fails, and `DegenerateSpectrum` if
/// nothing positive is left to keep.
pub fn make_centered_gp_eigendecomp(
    time: &TimeAxis,
    config: &GpConfig,
) -> Result<GpBasis, GpBasisError> {
    validate_variance_limit(config.variance_limit)?;
    let kernel = Kernel::from_config(config)?;
    let n_points = time.len();

    info!(
        "Building GP basis: kernel={}, points={}, zerosum={}, variance_limit={}.",
        kernel.kind(),
        n_points,
        config.zerosum,
        config.variance_limit
    );
    let start_time = std::time::Instant::now();

    let mut cov = kernel.covariance(time)?;
    if n_points == 1 {
        warn!("GP basis requested for a single time point; the basis is at most one column.");
    }
    if config.zerosum {
        cov = project_zero_sum(&cov);
    }

    let eig = LinAlgBackendProvider::<f64>::new()
        .eigh_upper(&cov)
        .map_err(GpBasisError::Decomposition)?;
    trace!("Eigendecomposition of {:?} covariance done in {:?}.", cov.dim(), start_time.elapsed());

    let spectrum = truncate_spectrum(&eig.eigenvalues, &eig.eigenvectors, config.variance_limit)?;
    let scale = spectrum.eigenvalues.mapv(f64::sqrt);
    let basis = &spectrum.eigenvectors * &scale;

    let gp_basis = GpBasis {
        basis,
        eigenvalues: spectrum.eigenvalues,
        total_variance: spectrum.total_variance,
        kernel: kernel.kind(),
        zerosum: config.zerosum,
    };
    debug!(
        "Kept {} of {} eigenpairs, explaining {:.4} of the variance.",
        gp_basis.n_basis(),
        n_points,
        gp_basis.explained_variance_ratio()
    );
    info!(
        "Built GP basis with {} functions over {} points in {:?}.",
        gp_basis.n_basis(),
        n_points,
        start_time.elapsed()
    );
    Ok(gp_basis)
}
