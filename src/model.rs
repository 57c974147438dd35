// src/model.rs

//! Glue between a GP basis and the model that consumes it.
//!
//! The forecasting model indexes each basis by a named dimension. A
//! [`CoordinateRegistry`] is whatever holds those dimensions on the model
//! side; [`make_gp_basis`] builds the basis and registers its coordinate.

use log::{debug, info};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::basis::{make_centered_gp_eigendecomp, GpBasis};
use crate::config::{GpConfig, KernelKind};
use crate::error::GpBasisError;
use crate::time_axis::{Scale, TimeAxis};

/// Days per unit of a bare-number lengthscale on a datetime axis.
const DAYS_PER_LENGTHSCALE_UNIT: f64 = 7.0;

/// Receives the named dimensions a model indexes its basis coefficients by.
pub trait CoordinateRegistry {
    /// Registers (or replaces) the coordinate `name` with the integer index `index`.
    fn add_coords(&mut self, name: &str, index: Range<usize>);
}

/// A plain in-memory coordinate registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCoords {
    coords: BTreeMap<String, Range<usize>>,
}

impl ModelCoords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Range<usize>> {
        self.coords.get(name)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.coords.keys().map(String::as_str)
    }
}

impl CoordinateRegistry for ModelCoords {
    fn add_coords(&mut self, name: &str, index: Range<usize>) {
        if let Some(previous) = self.coords.insert(name.to_string(), index.clone()) {
            debug!(
                "Coordinate '{}' replaced: {:?} -> {:?}.",
                name, previous, index
            );
        }
    }
}

/// Name of the dimension a GP basis is registered under.
pub fn basis_dim_name(key: Option<&str>) -> String {
    match key {
        Some(key) => format!("gp_{}_basis", key),
        None => "gp_basis".to_string(),
    }
}

/// Converts a bare-number lengthscale given in weeks into a duration.
fn weeks_to_duration(weeks: f64) -> Result<Scale, GpBasisError> {
    let nanos = weeks * DAYS_PER_LENGTHSCALE_UNIT * 86_400.0 * 1e9;
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return Err(GpBasisError::InvalidInput(format!(
            "lengthscale {} (weeks) does not fit a datetime axis.",
            weeks
        )));
    }
    Ok(Scale::Duration(chrono::Duration::nanoseconds(nanos.round() as i64)))
}

/// Rewrites bare-number Gaussian lengthscales as durations of `7 * l` days
/// when the axis is calendar time. Model configs give those lengthscales in
/// weeks.
fn adapt_config_to_axis(time: &TimeAxis, config: &GpConfig) -> Result<GpConfig, GpBasisError> {
    let mut adapted = config.clone();
    if !(time.is_datetime() && adapted.kernel == KernelKind::Gaussian) {
        return Ok(adapted);
    }
    if let Some(ls) = config.lengthscale.as_ref() {
        let converted = ls.try_map(|scale| match scale {
            Scale::Numeric(weeks) => weeks_to_duration(weeks),
            duration => Ok(duration),
        })?;
        debug!("Lengthscale {:?} on a datetime axis read as weeks: {:?}.", ls, converted);
        adapted.lengthscale = Some(converted);
    }
    Ok(adapted)
}

/// Builds the GP basis for `time` and registers its dimension with `registry`.
///
/// * `config` - `None` falls back to [`GpConfig::model_default`]. The caller's
///   config is never modified.
/// * `key` - distinguishes this basis from others in the same model; the
///   dimension is named `gp_{key}_basis` (or `gp_basis` without a key).
///
/// Returns the basis and the dimension name. The registry receives the
/// coordinate `0..n_basis` under that name.
pub fn make_gp_basis<R: CoordinateRegistry + ?Sized>(
    time: &TimeAxis,
    config: Option<&GpConfig>,
    key: Option<&str>,
    registry: &mut R,
) -> Result<(GpBasis, String), GpBasisError> {
    let base = match config {
        Some(config) => config.clone(),
        None => GpConfig::model_default(),
    };
    let config = adapt_config_to_axis(time, &base)?;

    let gp_basis = make_centered_gp_eigendecomp(time, &config)?;
    let dim = basis_dim_name(key);
    registry.add_coords(&dim, 0..gp_basis.n_basis());
    info!("Registered coordinate '{}' with {} basis functions.", dim, gp_basis.n_basis());

    Ok((gp_basis, dim))
}
