// src/kernel.rs

//! Covariance kernels evaluated on a fixed set of time points.

use log::{debug, trace};
use ndarray::{Array1, Array2, Zip};
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::config::{GpConfig, KernelKind};
use crate::error::GpBasisError;
use crate::time_axis::{Scale, TimeAxis};

/// numpy-style `isclose` tolerances used for the weight-sum check.
const WEIGHT_SUM_RTOL: f64 = 1e-5;
const WEIGHT_SUM_ATOL: f64 = 1e-8;
/// Relative tolerance for "the random-walk lengthscale was left at 1".
const UNIT_LENGTHSCALE_RTOL: f64 = 1e-7;

/// A validated covariance kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    /// Mixture of squared-exponential kernels:
    /// `sum_l w_l * exp(-((t_i - t_j) / l)^2 / 2) / L`.
    Gaussian {
        lengthscales: Vec<Scale>,
        weights: Vec<f64>,
    },
    /// `exp(-2 * (sin(pi * (t_i - t_j) / period) / lengthscale)^2)`.
    /// The lengthscale is dimensionless here.
    Periodic { lengthscale: f64, period: Scale },
    /// `min(t_i, t_j)`.
    RandomWalk,
}

impl Kernel {
    /// Validates `config` and builds the kernel it describes.
    ///
    /// # Errors
    /// * `InvalidConfig` if the Gaussian weights do not match the lengthscales
    ///   (count, finiteness, or a sum other than 1), or a periodic kernel has no period.
    /// * `Unsupported` for several lengthscales on a periodic kernel, weights on a
    ///   non-Gaussian kernel, or an explicit lengthscale on the random-walk kernel.
    /// * `UnitMismatch` for a duration lengthscale on the periodic kernel.
    pub fn from_config(config: &GpConfig) -> Result<Self, GpBasisError> {
        // An empty weight list counts as "not given".
        let weights = config
            .variance_weight
            .as_ref()
            .filter(|w| !w.is_empty());

        match config.kernel {
            KernelKind::Gaussian => {
                let lengthscales = config.lengthscales();
                if lengthscales.is_empty() {
                    return Err(GpBasisError::InvalidConfig(
                        "`lengthscale` must contain at least one value.".to_string(),
                    ));
                }
                let weights = match weights {
                    Some(w) => {
                        validate_weights(w, lengthscales.len())?;
                        w.clone()
                    }
                    None => vec![1.0; lengthscales.len()],
                };
                Ok(Kernel::Gaussian { lengthscales, weights })
            }
            KernelKind::Periodic => {
                let lengthscales = config.lengthscales();
                if lengthscales.len() > 1 {
                    return Err(GpBasisError::Unsupported(
                        "Multiple lengthscales can only be used with the Gaussian kernel.".to_string(),
                    ));
                }
                if weights.is_some() {
                    return Err(GpBasisError::Unsupported(
                        "`variance_weight` can only be used with the Gaussian kernel.".to_string(),
                    ));
                }
                let period = config.period.ok_or_else(|| {
                    GpBasisError::InvalidConfig("the periodic kernel requires a `period`.".to_string())
                })?;
                let lengthscale = match lengthscales.first() {
                    Some(Scale::Numeric(l)) => *l,
                    Some(Scale::Duration(_)) => {
                        return Err(GpBasisError::UnitMismatch(
                            "the periodic kernel's lengthscale is dimensionless; give a number.".to_string(),
                        ))
                    }
                    None => {
                        return Err(GpBasisError::InvalidConfig(
                            "`lengthscale` must contain at least one value.".to_string(),
                        ))
                    }
                };
                if !lengthscale.is_finite() || lengthscale == 0.0 {
                    return Err(GpBasisError::InvalidInput(format!(
                        "periodic lengthscale must be finite and non-zero, got {}.",
                        lengthscale
                    )));
                }
                Ok(Kernel::Periodic { lengthscale, period })
            }
            KernelKind::RandomWalk => {
                if let Some(ls) = &config.lengthscale {
                    let all_unit = ls.to_vec().iter().all(|s| match s {
                        Scale::Numeric(v) => (v - 1.0).abs() <= UNIT_LENGTHSCALE_RTOL,
                        Scale::Duration(_) => false,
                    });
                    if !all_unit {
                        return Err(GpBasisError::Unsupported(
                            "No lengthscale needed with the Random Walk kernel.".to_string(),
                        ));
                    }
                }
                if weights.is_some() {
                    return Err(GpBasisError::Unsupported(
                        "`variance_weight` can only be used with the Gaussian kernel.".to_string(),
                    ));
                }
                Ok(Kernel::RandomWalk)
            }
        }
    }

    pub fn kind(&self) -> KernelKind {
        match self {
            Kernel::Gaussian { .. } => KernelKind::Gaussian,
            Kernel::Periodic { .. } => KernelKind::Periodic,
            Kernel::RandomWalk => KernelKind::RandomWalk,
        }
    }

    /// Evaluates the symmetric `n x n` covariance over `axis`.
    pub fn covariance(&self, axis: &TimeAxis) -> Result<Array2<f64>, GpBasisError> {
        axis.validate()?;
        let t = axis.to_numeric();
        let n = t.len();
        trace!("Evaluating {} kernel on {} time points.", self.kind(), n);

        let cov = match self {
            Kernel::Gaussian { lengthscales, weights } => {
                let resolved: Vec<f64> = lengthscales
                    .iter()
                    .map(|ls| ls.resolve(axis))
                    .collect::<Result<_, _>>()?;
                debug!("Gaussian kernel resolved lengthscales: {:?}, weights: {:?}", resolved, weights);
                gaussian_covariance(&t, &resolved, weights)
            }
            Kernel::Periodic { lengthscale, period } => {
                let period = period.resolve(axis)?;
                periodic_covariance(&t, *lengthscale, period)
            }
            Kernel::RandomWalk => {
                if axis.is_datetime() {
                    return Err(GpBasisError::UnitMismatch(
                        "the random-walk kernel depends on the absolute time origin and needs a numeric axis."
                            .to_string(),
                    ));
                }
                random_walk_covariance(&t)
            }
        };
        Ok(cov)
    }
}

fn validate_weights(weights: &[f64], n_lengthscales: usize) -> Result<(), GpBasisError> {
    if weights.len() != n_lengthscales {
        return Err(GpBasisError::InvalidConfig(format!(
            "`variance_weight` must have the same length as `lengthscale` ({} vs {}).",
            weights.len(),
            n_lengthscales
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(GpBasisError::InvalidConfig(
            "`variance_weight` must contain finite, non-negative values.".to_string(),
        ));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_SUM_ATOL + WEIGHT_SUM_RTOL {
        return Err(GpBasisError::InvalidConfig(format!(
            "`variance_weight` must sum to 1, got {}.",
            total
        )));
    }
    Ok(())
}

/// `sum_l w_l * exp(-((t_i - t_j) / l)^2 / 2)`, divided by the number of lengthscales.
///
/// The division by `L` applies with and without explicit weights, so a
/// weighted mixture has marginal variance `1/L`.
pub fn gaussian_covariance(t: &Array1<f64>, lengthscales: &[f64], weights: &[f64]) -> Array2<f64> {
    let n = t.len();
    let n_scales = lengthscales.len() as f64;
    let mixed = lengthscales
        .par_iter()
        .zip(weights.par_iter())
        .map(|(&l, &w)| {
            let mut component = Array2::<f64>::zeros((n, n));
            Zip::indexed(&mut component).par_for_each(|(i, j), c| {
                let scaled = (t[i] - t[j]) / l;
                *c = w * (-0.5 * scaled * scaled).exp();
            });
            component
        })
        .reduce(|| Array2::<f64>::zeros((n, n)), |acc, component| acc + component);
    mixed / n_scales
}

pub fn periodic_covariance(t: &Array1<f64>, lengthscale: f64, period: f64) -> Array2<f64> {
    let n = t.len();
    let mut cov = Array2::<f64>::zeros((n, n));
    Zip::indexed(&mut cov).par_for_each(|(i, j), c| {
        let s = (PI * (t[i] - t[j]) / period).sin() / lengthscale;
        *c = (-2.0 * s * s).exp();
    });
    cov
}

pub fn random_walk_covariance(t: &Array1<f64>) -> Array2<f64> {
    let n = t.len();
    let mut cov = Array2::<f64>::zeros((n, n));
    Zip::indexed(&mut cov).par_for_each(|(i, j), c| {
        *c = t[i].min(t[j]);
    });
    cov
}
