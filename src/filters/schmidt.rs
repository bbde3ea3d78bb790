//! Schmidt-Kalman consider-parameter filter
//!
//! Extends the covariance-form update by partitioning the problem into a
//! solved-for state block and a consider (bias) block. The bias — here the
//! per-tracker position error — is never estimated: its covariance is held
//! fixed while the cross-covariance with the state is propagated, so the
//! bias uncertainty still inflates the innovation variance and deweights
//! the gain.
//!
//! Between steps the cross-covariance is deflated by a fixed factor to
//! model decaying correlation. The factor is a heuristic stabilizer with no
//! stated derivation; it is exposed as a constructor parameter rather than
//! baked in.

use core::marker::PhantomData;

use nalgebra::RealField;
use num_traits::Float;

use crate::models::MotionModel;
use crate::types::spaces::{ConsiderCovariance, StateCovariance, StateVector};
use crate::types::transforms::{ConsiderRow, CrossCovariance, ObservationRow};
use crate::{EstimError, Result};

/// Default cross-covariance deflation factor per filter step.
pub const DEFAULT_DEFLATION: f64 = 0.7;

// ============================================================================
// Schmidt Filter State
// ============================================================================

/// State estimate for the Schmidt-Kalman filter.
///
/// Carries the solved-for blocks (mean, covariance, cross-covariance); the
/// consider covariance is held by the filter since the update never touches
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchmidtState<T: RealField, const N: usize, const P: usize> {
    /// Solved-for state estimate mean
    pub mean: StateVector<T, N>,
    /// Solved-for state covariance (SigmaX)
    pub covariance: StateCovariance<T, N>,
    /// State-consider cross-covariance (SigmaXY)
    pub cross: CrossCovariance<T, N, P>,
}

impl<T: RealField + Copy, const N: usize, const P: usize> SchmidtState<T, N, P> {
    /// Creates a new filter state with zero initial cross-covariance.
    #[inline]
    pub fn new(mean: StateVector<T, N>, covariance: StateCovariance<T, N>) -> Self {
        Self {
            mean,
            covariance,
            cross: CrossCovariance::zeros(),
        }
    }
}

// ============================================================================
// Schmidt-Kalman Filter
// ============================================================================

/// A Schmidt-Kalman filter over an `N`-state with `W` process-noise
/// channels and `P` consider parameters.
#[derive(Debug, Clone)]
pub struct SchmidtKalmanFilter<T, M, const N: usize, const W: usize, const P: usize>
where
    T: RealField + Copy,
    M: MotionModel<T, N, W>,
{
    /// Motion model supplying transition matrix and process noise
    pub motion: M,
    /// Consider-parameter covariance (SigmaY), known a priori and never
    /// updated by the filter
    pub consider: ConsiderCovariance<T, P>,
    /// Per-step cross-covariance deflation factor
    pub deflation: T,
    _marker: PhantomData<T>,
}

impl<T, M, const N: usize, const W: usize, const P: usize> SchmidtKalmanFilter<T, M, N, W, P>
where
    T: RealField + Float + Copy,
    M: MotionModel<T, N, W>,
{
    /// Creates a new filter with an explicit deflation factor.
    ///
    /// # Panics
    /// Panics if `deflation` is not in [0, 1].
    pub fn new(motion: M, consider: ConsiderCovariance<T, P>, deflation: T) -> Self {
        assert!(
            deflation >= T::zero() && deflation <= T::one(),
            "Deflation factor must be in [0, 1]"
        );
        Self {
            motion,
            consider,
            deflation,
            _marker: PhantomData,
        }
    }

    /// Creates a new filter with the default deflation factor
    /// ([`DEFAULT_DEFLATION`]).
    pub fn with_default_deflation(motion: M, consider: ConsiderCovariance<T, P>) -> Self {
        Self::new(motion, consider, T::from_f64(DEFAULT_DEFLATION).unwrap())
    }

    /// Performs the prediction step.
    ///
    /// The solved-for blocks propagate as in the plain filter; the
    /// cross-covariance is carried through the transition and deflated.
    pub fn predict(&self, state: &SchmidtState<T, N, P>, dt: T) -> SchmidtState<T, N, P> {
        let predicted_mean = self.motion.propagate(&state.mean, dt);
        let f = self.motion.transition_matrix(dt);
        let q = self.motion.process_noise(dt);

        let covariance = f.propagate_covariance(&state.covariance).add(&q);
        let cross =
            CrossCovariance::from_matrix((f.as_matrix() * state.cross.as_matrix()) * self.deflation);

        SchmidtState {
            mean: predicted_mean,
            covariance,
            cross,
        }
    }

    /// Performs a scalar consider update.
    ///
    /// The innovation variance carries the full partitioned expansion
    ///
    /// ```text
    /// s = Hx·Px·Hxᵀ + Hx·Pxy·Hyᵀ + Hy·Pxyᵀ·Hxᵀ + Hy·Py·Hyᵀ + r
    /// ```
    ///
    /// and the gain is applied to the solved-for state only; the consider
    /// covariance is left untouched.
    ///
    /// # Errors
    /// Returns [`EstimError::NumericalInstability`] if the innovation
    /// variance is not strictly positive.
    pub fn update_scalar(
        &self,
        state: &SchmidtState<T, N, P>,
        row: &ObservationRow<T, N>,
        bias_row: &ConsiderRow<T, P>,
        residual: T,
        obs_var: T,
    ) -> Result<SchmidtState<T, N, P>> {
        let px = state.covariance.as_matrix();
        let pxy = state.cross.as_matrix();
        let py = self.consider.as_matrix();
        let hx = row.as_matrix();
        let hy = bias_row.as_matrix();

        let s = (hx * px * hx.transpose())[(0, 0)]
            + (hx * pxy * hy.transpose())[(0, 0)]
            + (hy * pxy.transpose() * hx.transpose())[(0, 0)]
            + (hy * py * hy.transpose())[(0, 0)]
            + obs_var;
        if s <= T::zero() {
            return Err(EstimError::NumericalInstability);
        }

        // Gain over the solved-for state only.
        let k = (px * hx.transpose() + pxy * hy.transpose()) / s;

        let mean = StateVector::from_svector(state.mean.as_svector() + k * residual);

        let covariance =
            StateCovariance::from_matrix(px - k * (hx * px + hy * pxy.transpose())).symmetrize();
        let cross = CrossCovariance::from_matrix(pxy - k * (hx * pxy + hy * py));

        Ok(SchmidtState {
            mean,
            covariance,
            cross,
        })
    }
}
