// src/config.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::error::GpBasisError;
use crate::time_axis::Scale;

/// The covariance family used to build the basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KernelKind {
    /// Squared-exponential kernel, optionally a weighted mixture over lengthscales.
    Gaussian,
    /// Exp-sine-squared kernel with a fixed period.
    Periodic,
    /// Brownian-motion kernel `min(t_i, t_j)`.
    RandomWalk,
}

impl KernelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelKind::Gaussian => "gaussian",
            KernelKind::Periodic => "periodic",
            KernelKind::RandomWalk => "randomwalk",
        }
    }
}

impl FromStr for KernelKind {
    type Err = GpBasisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(KernelKind::Gaussian),
            "periodic" => Ok(KernelKind::Periodic),
            "randomwalk" | "random_walk" => Ok(KernelKind::RandomWalk),
            _ => Err(GpBasisError::UnknownKernel(s.to_string())),
        }
    }
}

impl TryFrom<String> for KernelKind {
    type Error = GpBasisError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KernelKind> for String {
    fn from(kind: KernelKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lengthscale or a list of them. Lists are only meaningful for the
/// Gaussian kernel, where the per-lengthscale covariances are mixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lengthscales {
    One(Scale),
    Many(Vec<Scale>),
}

impl Lengthscales {
    pub fn to_vec(&self) -> Vec<Scale> {
        match self {
            Lengthscales::One(s) => vec![*s],
            Lengthscales::Many(v) => v.clone(),
        }
    }

    /// Applies `f` to every scale, keeping the one/many shape. Stops at the
    /// first error.
    pub fn try_map<E, F>(&self, mut f: F) -> Result<Lengthscales, E>
    where
        F: FnMut(Scale) -> Result<Scale, E>,
    {
        Ok(match self {
            Lengthscales::One(s) => Lengthscales::One(f(*s)?),
            Lengthscales::Many(v) => {
                Lengthscales::Many(v.iter().map(|s| f(*s)).collect::<Result<Vec<_>, E>>()?)
            }
        })
    }
}

impl From<f64> for Lengthscales {
    fn from(v: f64) -> Self {
        Lengthscales::One(Scale::Numeric(v))
    }
}

impl From<Scale> for Lengthscales {
    fn from(s: Scale) -> Self {
        Lengthscales::One(s)
    }
}

impl From<Vec<Scale>> for Lengthscales {
    fn from(v: Vec<Scale>) -> Self {
        Lengthscales::Many(v)
    }
}

/// Lengthscale used when a config leaves it out.
pub const DEFAULT_LENGTHSCALE: f64 = 1.0;
/// Variance fraction kept when a config leaves `variance_limit` out.
pub const DEFAULT_VARIANCE_LIMIT: f64 = 0.95;

/// Configuration of a GP basis.
///
/// Field names match the configuration dictionaries the forecasting model
/// ships, so a JSON file such as
///
/// ```json
/// { "lengthscale": [4, 12], "variance_weight": [0.3, 0.7], "zerosum": true }
/// ```
///
/// deserializes directly. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpConfig {
    /// Lengthscale(s), numbers or duration strings. `None` means [`DEFAULT_LENGTHSCALE`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lengthscale: Option<Lengthscales>,
    /// Covariance family.
    pub kernel: KernelKind,
    /// Constrain every basis function to sum to zero over the time points.
    pub zerosum: bool,
    /// Fraction of the total variance the truncated basis must exceed.
    /// `1.0` keeps every usable eigenvector.
    pub variance_limit: f64,
    /// Mixture weights, one per lengthscale (Gaussian kernel only). Must sum to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_weight: Option<Vec<f64>>,
    /// Period of the periodic kernel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Scale>,
}

impl Default for GpConfig {
    fn default() -> Self {
        GpConfig {
            lengthscale: None,
            kernel: KernelKind::Gaussian,
            zerosum: false,
            variance_limit: DEFAULT_VARIANCE_LIMIT,
            variance_weight: None,
            period: None,
        }
    }
}

impl GpConfig {
    /// The configuration the model layer falls back to when the caller passes
    /// none: lengthscale 8, Gaussian kernel, no zero-sum, 99% of the variance.
    pub fn model_default() -> Self {
        GpConfig {
            lengthscale: Some(Lengthscales::from(8.0)),
            kernel: KernelKind::Gaussian,
            zerosum: false,
            variance_limit: 0.99,
            variance_weight: None,
            period: None,
        }
    }

    pub fn gaussian<L: Into<Lengthscales>>(lengthscale: L) -> Self {
        GpConfig {
            lengthscale: Some(lengthscale.into()),
            ..GpConfig::default()
        }
    }

    pub fn periodic<L: Into<Scale>, P: Into<Scale>>(lengthscale: L, period: P) -> Self {
        GpConfig {
            lengthscale: Some(Lengthscales::One(lengthscale.into())),
            kernel: KernelKind::Periodic,
            period: Some(period.into()),
            ..GpConfig::default()
        }
    }

    pub fn random_walk() -> Self {
        GpConfig {
            kernel: KernelKind::RandomWalk,
            ..GpConfig::default()
        }
    }

    pub fn with_zerosum(mut self, zerosum: bool) -> Self {
        self.zerosum = zerosum;
        self
    }

    pub fn with_variance_limit(mut self, variance_limit: f64) -> Self {
        self.variance_limit = variance_limit;
        self
    }

    pub fn with_variance_weight(mut self, weights: Vec<f64>) -> Self {
        self.variance_weight = Some(weights);
        self
    }

    /// The lengthscales to use, falling back to [`DEFAULT_LENGTHSCALE`].
    pub fn lengthscales(&self) -> Vec<Scale> {
        match &self.lengthscale {
            Some(ls) => ls.to_vec(),
            None => vec![Scale::Numeric(DEFAULT_LENGTHSCALE)],
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, GpBasisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, GpBasisError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
