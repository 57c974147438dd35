// src/error.rs

use std::error::Error;
use std::fmt;

/// A thread-safe wrapper for standard dynamic errors,
/// so they implement `Send` and `Sync`.
pub type ThreadSafeStdError = Box<dyn Error + Send + Sync + 'static>;

/// Errors produced while validating a GP configuration or building its basis.
#[derive(Debug)]
pub enum GpBasisError {
    /// The time axis or a numeric parameter is unusable (empty, non-finite, ...).
    InvalidInput(String),
    /// The configuration is internally inconsistent, e.g. weights that do not sum to 1.
    InvalidConfig(String),
    /// A kernel/parameter combination that is explicitly rejected.
    Unsupported(String),
    /// The kernel name is not one of `gaussian`, `periodic` or `randomwalk`.
    UnknownKernel(String),
    /// A duration was used on a numeric axis, or a bare number on a datetime axis.
    UnitMismatch(String),
    /// A duration string could not be parsed.
    InvalidDuration(String),
    /// The eigen backend failed.
    Decomposition(ThreadSafeStdError),
    /// No strictly positive eigenvalue survived the precision cutoff.
    DegenerateSpectrum(String),
    /// Reading or writing a saved basis failed.
    Io(std::io::Error),
    /// Encoding or decoding a saved basis (or a JSON config) failed.
    Serialization(String),
}

impl fmt::Display for GpBasisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpBasisError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            GpBasisError::InvalidConfig(msg) => write!(f, "invalid GP configuration: {}", msg),
            GpBasisError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            GpBasisError::UnknownKernel(name) => write!(
                f,
                "unknown kernel = {}. Accepted values are 'gaussian', 'periodic' and 'randomwalk'",
                name
            ),
            GpBasisError::UnitMismatch(msg) => write!(f, "unit mismatch: {}", msg),
            GpBasisError::InvalidDuration(msg) => write!(f, "invalid duration: {}", msg),
            GpBasisError::Decomposition(e) => write!(f, "eigendecomposition of covariance failed: {}", e),
            GpBasisError::DegenerateSpectrum(msg) => write!(f, "degenerate spectrum: {}", msg),
            GpBasisError::Io(e) => write!(f, "I/O error: {}", e),
            GpBasisError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl Error for GpBasisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GpBasisError::Decomposition(e) => Some(e.as_ref()),
            GpBasisError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpBasisError {
    fn from(e: std::io::Error) -> Self {
        GpBasisError::Io(e)
    }
}

impl From<serde_json::Error> for GpBasisError {
    fn from(e: serde_json::Error) -> Self {
        GpBasisError::Serialization(format!("failed to parse GP config: {}", e))
    }
}
