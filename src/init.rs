//! Batch weighted-least-squares position initializer
//!
//! Triangulates an initial target position from one set of range
//! measurements by Gauss-Newton iteration, and returns the position together
//! with its formal covariance `(HᵀWH)⁻¹`. The result primes every filter
//! variant with a common a priori estimate.

use nalgebra::{Cholesky, RealField, SMatrix, SVector, Vector3};
use num_traits::Float;

use crate::models::line_of_sight;
use crate::{EstimError, Result};

/// Batch WLS position solver.
#[derive(Debug, Clone)]
pub struct BatchInitializer<T: RealField> {
    /// Maximum number of Gauss-Newton iterations
    pub max_iterations: usize,
    /// Convergence tolerance on the correction norm
    pub tolerance: T,
}

impl<T: RealField + Float + Copy> Default for BatchInitializer<T> {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: T::from_f64(1e-10).unwrap(),
        }
    }
}

impl<T: RealField + Float + Copy> BatchInitializer<T> {
    /// Solves for the target position from one range per tracker.
    ///
    /// # Arguments
    /// - `trackers`: tracker positions (at least 3, non-coplanar for a
    ///   well-conditioned solve)
    /// - `ranges`: measured ranges, one per tracker
    /// - `sigma`: range noise standard deviation (must be > 0)
    /// - `guess`: starting point for the iteration
    ///
    /// # Returns
    /// The estimated position and its covariance `σ²·(HᵀH)⁻¹`.
    ///
    /// # Errors
    /// - [`EstimError::DegenerateGeometry`] if an iterate lands on a tracker
    /// - [`EstimError::SingularMatrix`] if the normal equations are singular
    ///
    /// # Panics
    /// Panics if `trackers` and `ranges` differ in length, fewer than 3
    /// trackers are given, or `sigma <= 0`.
    pub fn solve_position(
        &self,
        trackers: &[Vector3<T>],
        ranges: &[T],
        sigma: T,
        guess: Vector3<T>,
    ) -> Result<(Vector3<T>, SMatrix<T, 3, 3>)> {
        assert_eq!(
            trackers.len(),
            ranges.len(),
            "One range per tracker required"
        );
        assert!(trackers.len() >= 3, "At least 3 trackers required");
        assert!(sigma > T::zero(), "Range noise sigma must be positive");

        let mut position = guess;
        let mut normal = SMatrix::<T, 3, 3>::zeros();

        for _ in 0..self.max_iterations {
            normal = SMatrix::zeros();
            let mut rhs = SVector::<T, 3>::zeros();

            for (tracker, &range) in trackers.iter().zip(ranges.iter()) {
                let (predicted, los) = line_of_sight(tracker, &position)?;
                let residual = range - predicted;
                normal += los * los.transpose();
                rhs += los * residual;
            }

            let chol = Cholesky::new(normal).ok_or(EstimError::SingularMatrix)?;
            let correction = chol.solve(&rhs);
            position += correction;

            if correction.norm() < self.tolerance {
                break;
            }
        }

        let chol = Cholesky::new(normal).ok_or(EstimError::SingularMatrix)?;
        let covariance = chol.inverse() * sigma * sigma;
        Ok((position, covariance))
    }
}
