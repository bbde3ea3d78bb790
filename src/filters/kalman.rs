//! Linearized Kalman filter for single-target tracking
//!
//! The classic covariance-form recursion, linearized around the current
//! state estimate. Observations are processed as scalars, one at a time,
//! which keeps the innovation inverse trivial and matches how the tracker
//! measurement stream arrives (one range or bearing component per row).
//!
//! This is the baseline the square-root variants are compared against: it
//! is the cheapest form, but the covariance update can lose symmetry and
//! positive semi-definiteness in finite precision. The Joseph-form update
//! limits (without eliminating) that loss.

use core::marker::PhantomData;

use nalgebra::RealField;
use num_traits::Float;

use crate::models::MotionModel;
use crate::types::spaces::{StateCovariance, StateVector};
use crate::types::transforms::{
    joseph_update, scalar_innovation_variance, scalar_kalman_gain, ObservationRow,
};
use crate::{EstimError, Result};

// ============================================================================
// Kalman Filter State
// ============================================================================

/// State estimate for the covariance-form filters.
///
/// Owned exclusively by the active filter instance during a run and
/// reinitialized from the shared a priori estimate at the start of each
/// variant's pass.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanState<T: RealField, const N: usize> {
    /// State estimate mean
    pub mean: StateVector<T, N>,
    /// State estimate covariance
    pub covariance: StateCovariance<T, N>,
}

impl<T: RealField + Copy, const N: usize> KalmanState<T, N> {
    /// Creates a new filter state.
    #[inline]
    pub fn new(mean: StateVector<T, N>, covariance: StateCovariance<T, N>) -> Self {
        Self { mean, covariance }
    }
}

// ============================================================================
// Linearized Kalman Filter
// ============================================================================

/// A linearized Kalman filter over an `N`-dimensional state with `W`
/// process-noise channels.
///
/// The caller supplies, per observation, the Jacobian row linearized at the
/// predicted state and the measurement residual `z - h(x̄)`; the filter is
/// agnostic to which sensor produced them.
#[derive(Debug, Clone)]
pub struct LinearizedKalmanFilter<T, M, const N: usize, const W: usize>
where
    T: RealField + Copy,
    M: MotionModel<T, N, W>,
{
    /// Motion model supplying transition matrix and process noise
    pub motion: M,
    _marker: PhantomData<T>,
}

impl<T, M, const N: usize, const W: usize> LinearizedKalmanFilter<T, M, N, W>
where
    T: RealField + Float + Copy,
    M: MotionModel<T, N, W>,
{
    /// Creates a new filter around the given motion model.
    #[inline]
    pub fn new(motion: M) -> Self {
        Self {
            motion,
            _marker: PhantomData,
        }
    }

    /// Performs the prediction step.
    ///
    /// - x̄ = f(x)
    /// - P̄ = F·P·Fᵀ + Q
    pub fn predict(&self, state: &KalmanState<T, N>, dt: T) -> KalmanState<T, N> {
        let predicted_mean = self.motion.propagate(&state.mean, dt);
        let f = self.motion.transition_matrix(dt);
        let q = self.motion.process_noise(dt);
        let predicted_cov = f.propagate_covariance(&state.covariance).add(&q);

        KalmanState {
            mean: predicted_mean,
            covariance: predicted_cov,
        }
    }

    /// Performs a scalar-observation update.
    ///
    /// - s = h·P̄·hᵀ + r
    /// - k = P̄·hᵀ / s
    /// - x = x̄ + k·(z - h(x̄))
    /// - P = (I - k·h)·P̄·(I - k·h)ᵀ + k·r·kᵀ
    ///
    /// # Arguments
    /// - `state`: predicted state estimate
    /// - `row`: observation Jacobian linearized at the predicted state
    /// - `residual`: measurement residual `z - h(x̄)`
    /// - `obs_var`: scalar observation noise variance
    ///
    /// # Errors
    /// Returns [`EstimError::NumericalInstability`] if the innovation
    /// variance is not strictly positive (the covariance has collapsed or
    /// gone indefinite).
    pub fn update_scalar(
        &self,
        state: &KalmanState<T, N>,
        row: &ObservationRow<T, N>,
        residual: T,
        obs_var: T,
    ) -> Result<KalmanState<T, N>> {
        let s = scalar_innovation_variance(&state.covariance, row, obs_var);
        let gain =
            scalar_kalman_gain(&state.covariance, row, s).ok_or(EstimError::NumericalInstability)?;

        let mean = state.mean + gain.correct(residual);
        let covariance = joseph_update(&state.covariance, &gain, row, obs_var);

        Ok(KalmanState { mean, covariance })
    }
}
