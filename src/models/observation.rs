//! Observation (sensor) models
//!
//! Range and bearing geometry for a fixed tracker observing the target.
//! Each measurement is a scalar tied to one tracker at one time index; the
//! Jacobian rows are zero-padded over the velocity components.

use nalgebra::{RealField, SMatrix, Vector3};
use num_traits::Float;

use crate::types::spaces::StateVector;
use crate::types::transforms::{ConsiderRow, ObservationRow};
use crate::{EstimError, Result};

/// Computes the range and unit line-of-sight vector from tracker to target.
///
/// # Errors
/// Returns [`EstimError::DegenerateGeometry`] if tracker and target
/// coincide: the unit line-of-sight (and with it every observation
/// Jacobian) is undefined at zero range. Failing fast here is a deliberate
/// choice over clamping; the reference behavior was silent division by zero.
pub fn line_of_sight<T: RealField + Float + Copy>(
    tracker: &Vector3<T>,
    target: &Vector3<T>,
) -> Result<(T, Vector3<T>)> {
    let diff = target - tracker;
    let range = diff.norm();
    if range < T::from_f64(1e-10).unwrap() {
        return Err(EstimError::DegenerateGeometry);
    }
    Ok((range, diff / range))
}

/// Euclidean distance between tracker and target position.
pub fn predicted_range<T: RealField + Copy>(tracker: &Vector3<T>, target: &Vector3<T>) -> T {
    (target - tracker).norm()
}

// ============================================================================
// Tracker Sensor
// ============================================================================

/// A fixed tracker producing range (and optionally bearing) observations.
///
/// Bearing observations are the first two components of the unit
/// line-of-sight vector, not angles; their Jacobians follow directly from
/// the line-of-sight geometry.
#[derive(Debug, Clone)]
pub struct TrackerSensor<T: RealField> {
    /// Tracker position (static for the duration of a run)
    pub position: Vector3<T>,
    /// Range measurement noise standard deviation
    pub sigma_range: T,
    /// Bearing-component measurement noise standard deviation
    pub sigma_bearing: T,
}

impl<T: RealField + Float + Copy> TrackerSensor<T> {
    /// Creates a tracker sensor at the given position.
    ///
    /// # Arguments
    /// - `position`: tracker position
    /// - `sigma_range`: range noise standard deviation (must be > 0)
    /// - `sigma_bearing`: bearing-component noise standard deviation (must be > 0)
    ///
    /// # Panics
    /// Panics if a noise parameter is non-positive.
    pub fn new(position: Vector3<T>, sigma_range: T, sigma_bearing: T) -> Self {
        assert!(
            sigma_range > T::zero(),
            "Range noise sigma_range must be positive"
        );
        assert!(
            sigma_bearing > T::zero(),
            "Bearing noise sigma_bearing must be positive"
        );
        Self {
            position,
            sigma_range,
            sigma_bearing,
        }
    }

    /// Extracts the position block of the tracking state.
    #[inline]
    fn target_position(state: &StateVector<T, 6>) -> Vector3<T> {
        state.as_svector().fixed_rows::<3>(0).into_owned()
    }

    /// Predicted range to the target for the given state estimate.
    pub fn predicted_range(&self, state: &StateVector<T, 6>) -> Result<T> {
        let (range, _) = line_of_sight(&self.position, &Self::target_position(state))?;
        Ok(range)
    }

    /// Range Jacobian row ∂range/∂state: unit line-of-sight over position,
    /// zero over velocity.
    pub fn range_jacobian_row(&self, state: &StateVector<T, 6>) -> Result<ObservationRow<T, 6>> {
        let (_, los) = line_of_sight(&self.position, &Self::target_position(state))?;
        let mut row = SMatrix::<T, 1, 6>::zeros();
        for i in 0..3 {
            row[(0, i)] = los[i];
        }
        Ok(ObservationRow::from_matrix(row))
    }

    /// Range Jacobian with respect to the tracker-position bias.
    ///
    /// Moving the tracker toward the target shortens the range, so this is
    /// the negated line-of-sight row.
    pub fn range_bias_jacobian(&self, state: &StateVector<T, 6>) -> Result<ConsiderRow<T, 3>> {
        let (_, los) = line_of_sight(&self.position, &Self::target_position(state))?;
        Ok(ConsiderRow::from_matrix(-los.transpose()))
    }

    /// Predicted bearing components: the first two components of the unit
    /// line-of-sight vector.
    pub fn bearing_components(&self, state: &StateVector<T, 6>) -> Result<(T, T)> {
        let (_, los) = line_of_sight(&self.position, &Self::target_position(state))?;
        Ok((los[0], los[1]))
    }

    /// Jacobian rows of the two bearing components with respect to the state.
    ///
    /// ∂uᵢ/∂rⱼ = (δᵢⱼ - uᵢ·uⱼ) / range, zero-padded over velocity.
    pub fn bearing_jacobian_rows(
        &self,
        state: &StateVector<T, 6>,
    ) -> Result<[ObservationRow<T, 6>; 2]> {
        let (range, los) = line_of_sight(&self.position, &Self::target_position(state))?;

        let mut rows = [SMatrix::<T, 1, 6>::zeros(); 2];
        for (i, row) in rows.iter_mut().enumerate() {
            for j in 0..3 {
                let delta = if i == j { T::one() } else { T::zero() };
                row[(0, j)] = (delta - los[i] * los[j]) / range;
            }
        }
        Ok([
            ObservationRow::from_matrix(rows[0]),
            ObservationRow::from_matrix(rows[1]),
        ])
    }

    /// Jacobians of the bearing components with respect to the
    /// tracker-position bias (negated state rows, position block only).
    pub fn bearing_bias_jacobians(
        &self,
        state: &StateVector<T, 6>,
    ) -> Result<[ConsiderRow<T, 3>; 2]> {
        let rows = self.bearing_jacobian_rows(state)?;
        let mut out = [SMatrix::<T, 1, 3>::zeros(); 2];
        for (i, row) in rows.iter().enumerate() {
            for j in 0..3 {
                out[i][(0, j)] = -row.as_matrix()[(0, j)];
            }
        }
        Ok([
            ConsiderRow::from_matrix(out[0]),
            ConsiderRow::from_matrix(out[1]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor_at(x: f64, y: f64, z: f64) -> TrackerSensor<f64> {
        TrackerSensor::new(Vector3::new(x, y, z), 0.05, 0.05)
    }

    #[test]
    fn test_predicted_range() {
        let sensor = sensor_at(0.0, 0.0, 0.0);
        let state = StateVector::from_array([3.0, 4.0, 0.0, 1.0, 1.0, 1.0]);
        assert!((sensor.predicted_range(&state).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_range_jacobian_is_unit_los() {
        let sensor = sensor_at(0.0, 0.0, 0.0);
        let state = StateVector::from_array([3.0, 4.0, 0.0, 0.0, 0.0, 0.0]);
        let row = sensor.range_jacobian_row(&state).unwrap();

        assert!((row.as_matrix()[(0, 0)] - 0.6).abs() < 1e-12);
        assert!((row.as_matrix()[(0, 1)] - 0.8).abs() < 1e-12);
        assert!(row.as_matrix()[(0, 2)].abs() < 1e-12);
        // Velocity components zero-padded.
        for j in 3..6 {
            assert_eq!(row.as_matrix()[(0, j)], 0.0);
        }
    }

    #[test]
    fn test_bias_jacobian_is_negated_los() {
        let sensor = sensor_at(0.0, 0.0, 0.0);
        let state = StateVector::from_array([3.0, 4.0, 0.0, 0.0, 0.0, 0.0]);
        let row = sensor.range_bias_jacobian(&state).unwrap();

        assert!((row.as_matrix()[(0, 0)] + 0.6).abs() < 1e-12);
        assert!((row.as_matrix()[(0, 1)] + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_components() {
        let sensor = sensor_at(0.0, 0.0, 0.0);
        let state = StateVector::from_array([3.0, 4.0, 0.0, 0.0, 0.0, 0.0]);
        let (bx, by) = sensor.bearing_components(&state).unwrap();
        assert!((bx - 0.6).abs() < 1e-12);
        assert!((by - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_jacobian_numerically() {
        let sensor = sensor_at(0.1, -0.2, 0.3);
        let state = StateVector::from_array([1.0, 2.0, -0.5, 0.0, 0.0, 0.0]);
        let rows = sensor.bearing_jacobian_rows(&state).unwrap();

        let eps = 1e-7;
        for i in 0..2 {
            for j in 0..3 {
                let mut bumped = *state.as_svector();
                bumped[j] += eps;
                let bumped = StateVector::from_svector(bumped);
                let (bx0, by0) = sensor.bearing_components(&state).unwrap();
                let (bx1, by1) = sensor.bearing_components(&bumped).unwrap();
                let numeric = (if i == 0 { bx1 - bx0 } else { by1 - by0 }) / eps;
                assert!((rows[i].as_matrix()[(0, j)] - numeric).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_zero_range_fails_fast() {
        let sensor = sensor_at(1.0, 1.0, 1.0);
        let state = StateVector::from_array([1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            sensor.predicted_range(&state),
            Err(EstimError::DegenerateGeometry)
        );
        assert!(sensor.range_jacobian_row(&state).is_err());
    }
}
