//! Consistency statistics
//!
//! Used to check whether a true value falls inside a confidence ellipsoid
//! of an estimate; not part of the filter recursions themselves.

use nalgebra::{Cholesky, RealField, SMatrix, SVector};

use crate::{EstimError, Result};

/// Computes the Mahalanobis distance `√((x-μ)ᵀ·Σ⁻¹·(x-μ))`.
///
/// The inverse is applied through a Cholesky solve rather than a general
/// matrix inverse.
///
/// # Errors
/// Returns [`EstimError::NotPositiveSemiDefinite`] if the covariance is not
/// positive definite.
pub fn mahalanobis_distance<T: RealField + Copy, const N: usize>(
    x: &SVector<T, N>,
    mean: &SVector<T, N>,
    cov: &SMatrix<T, N, N>,
) -> Result<T> {
    let chol = Cholesky::new(*cov).ok_or(EstimError::NotPositiveSemiDefinite)?;
    let diff = x - mean;
    let solved = chol.solve(&diff);
    Ok(diff.dot(&solved).sqrt())
}
