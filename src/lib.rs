// Reduced-rank Gaussian process bases

#![doc = include_str!("../README.md")]

pub mod basis;
pub mod config;
pub mod error;
pub mod kernel;
pub mod linalg_backends;
pub mod model;
pub mod persistence;
pub mod time_axis;
pub mod zerosum;

pub use basis::{make_centered_gp_eigendecomp, truncate_spectrum, GpBasis, TruncatedSpectrum};
pub use config::{GpConfig, KernelKind, Lengthscales};
pub use error::{GpBasisError, ThreadSafeStdError};
pub use kernel::Kernel;
pub use model::{make_gp_basis, CoordinateRegistry, ModelCoords};
pub use time_axis::{parse_duration, Scale, TimeAxis};
pub use zerosum::make_sum_zero_hh;
