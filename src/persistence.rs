// src/persistence.rs

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::basis::GpBasis;
use crate::error::GpBasisError;

impl GpBasis {
    /// Saves the basis to a file using bincode, so a model specification can
    /// reuse it without re-running the eigendecomposition.
    ///
    /// # Errors
    /// Returns an error if file I/O or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GpBasisError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| GpBasisError::Serialization(format!("failed to serialize GP basis: {}", e)))?;
        Ok(())
    }

    /// Loads a basis previously written by [`GpBasis::save`].
    ///
    /// # Errors
    /// Returns an error if file I/O or deserialization fails, or if the loaded
    /// basis is inconsistent: eigenvalue count not matching the basis width,
    /// negative or non-finite eigenvalues, or non-finite basis entries.
    /// Zero eigenvalues survive the precision cutoff and are accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GpBasisError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let gp_basis: GpBasis = bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(|e| GpBasisError::Serialization(format!("failed to deserialize GP basis: {}", e)))?;

        if gp_basis.eigenvalues.len() != gp_basis.basis.ncols() {
            return Err(GpBasisError::Serialization(format!(
                "loaded GP basis has {} eigenvalues but {} basis columns.",
                gp_basis.eigenvalues.len(),
                gp_basis.basis.ncols()
            )));
        }
        if gp_basis.eigenvalues.iter().any(|&v| !v.is_finite() || v < 0.0) {
            return Err(GpBasisError::Serialization(
                "loaded GP basis has non-finite or negative eigenvalues.".to_string(),
            ));
        }
        if gp_basis.basis.iter().any(|v| !v.is_finite()) {
            return Err(GpBasisError::Serialization(
                "loaded GP basis contains non-finite entries.".to_string(),
            ));
        }
        Ok(gp_basis)
    }
}
