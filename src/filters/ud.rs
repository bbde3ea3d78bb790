//! U-D factorized sequential filter (Bierman/Thornton)
//!
//! Maintains the covariance as `P = U·D·Uᵀ` with unit upper-triangular U
//! and non-negative diagonal D, and never forms P in the recursion. The
//! factored form cannot go asymmetric and cannot silently lose positive
//! semi-definiteness, which is the entire point of carrying it.
//!
//! - **Predict** is Thornton's modified weighted Gram-Schmidt pass over
//!   `[Φ·U | G]` with weights `[D, q]`, folding the process noise in as
//!   extra weighted columns.
//! - **Update** is Bierman's rank-1 scalar observation update. Observations
//!   from a set are processed strictly one at a time, each consuming the
//!   factors produced by the previous one.

use core::marker::PhantomData;

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::linalg::{ud_factorize, ud_reconstruct, UdFactors};
use crate::models::MotionModel;
use crate::types::spaces::{StateCovariance, StateVector};
use crate::types::transforms::ObservationRow;
use crate::{EstimError, Result};

// ============================================================================
// U-D Filter State
// ============================================================================

/// State estimate for the U-D filter: mean plus covariance factors.
///
/// Each predict/update produces a fresh consistent `(U, D)` pair; the pair
/// is never left partially mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct UdState<T: RealField, const N: usize> {
    /// State estimate mean
    pub mean: StateVector<T, N>,
    /// Covariance factors `P = U·D·Uᵀ`
    pub factors: UdFactors<T, N>,
}

impl<T: RealField + Copy, const N: usize> UdState<T, N> {
    /// Initializes the factors from a full covariance matrix.
    ///
    /// # Errors
    /// Returns [`EstimError::NotPositiveSemiDefinite`] if the covariance
    /// cannot be factorized.
    pub fn from_covariance(
        mean: StateVector<T, N>,
        covariance: &StateCovariance<T, N>,
    ) -> Result<Self> {
        let factors = ud_factorize(covariance.as_matrix())?;
        Ok(Self { mean, factors })
    }

    /// Reconstructs the full covariance from the factors.
    pub fn covariance(&self) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(ud_reconstruct(&self.factors))
    }
}

// ============================================================================
// U-D Filter
// ============================================================================

/// A U-D factorized Kalman filter over an `N`-state with `W` process-noise
/// channels.
#[derive(Debug, Clone)]
pub struct UdFilter<T, M, const N: usize, const W: usize>
where
    T: RealField + Copy,
    M: MotionModel<T, N, W>,
{
    /// Motion model supplying transition matrix and noise mapping
    pub motion: M,
    _marker: PhantomData<T>,
}

impl<T, M, const N: usize, const W: usize> UdFilter<T, M, N, W>
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

    /// Performs the Thornton prediction step.
    ///
    /// Runs a modified weighted Gram-Schmidt orthogonalization over the
    /// row space of `[Φ·U | G]` with column weights `[D, q·I]`. The full
    /// covariance `Φ·U·D·Uᵀ·Φᵀ + G·q·Gᵀ` is never formed.
    pub fn predict(&self, state: &UdState<T, N>, dt: T) -> UdState<T, N> {
        let mean = self.motion.propagate(&state.mean, dt);

        let phi = self.motion.transition_matrix(dt);
        let mut w1: SMatrix<T, N, N> = phi.as_matrix() * state.factors.u;
        let mut w2: SMatrix<T, N, W> = self.motion.noise_mapping(dt);
        let d1 = state.factors.d;
        let q = self.motion.noise_variance();

        let mut u = SMatrix::<T, N, N>::identity();
        let mut d = SVector::<T, N>::zeros();

        for j in (0..N).rev() {
            let mut dj = T::zero();
            for k in 0..N {
                dj += w1[(j, k)] * w1[(j, k)] * d1[k];
            }
            for k in 0..W {
                dj += w2[(j, k)] * w2[(j, k)] * q;
            }
            d[j] = dj;

            if dj == T::zero() {
                continue;
            }

            for i in 0..j {
                let mut num = T::zero();
                for k in 0..N {
                    num += w1[(i, k)] * w1[(j, k)] * d1[k];
                }
                for k in 0..W {
                    num += w2[(i, k)] * w2[(j, k)] * q;
                }
                let uij = num / dj;
                u[(i, j)] = uij;

                for k in 0..N {
                    let w1jk = w1[(j, k)];
                    w1[(i, k)] -= uij * w1jk;
                }
                for k in 0..W {
                    let w2jk = w2[(j, k)];
                    w2[(i, k)] -= uij * w2jk;
                }
            }
        }

        UdState {
            mean,
            factors: UdFactors { u, d },
        }
    }

    /// Performs Bierman's sequential scalar observation update.
    ///
    /// Numerically equivalent to the covariance-form update but carried
    /// out as rank-1 modifications of U and D.
    ///
    /// # Arguments
    /// - `state`: predicted state with current factors
    /// - `row`: observation Jacobian linearized at the predicted state
    /// - `residual`: measurement residual `z - h(x̄)`
    /// - `obs_var`: scalar observation noise variance
    ///
    /// # Errors
    /// Returns [`EstimError::NumericalInstability`] if `obs_var` is not
    /// strictly positive or the running innovation variance is driven
    /// non-positive.
    pub fn update_scalar(
        &self,
        state: &UdState<T, N>,
        row: &ObservationRow<T, N>,
        residual: T,
        obs_var: T,
    ) -> Result<UdState<T, N>> {
        if obs_var <= T::zero() {
            return Err(EstimError::NumericalInstability);
        }

        let u_old = state.factors.u;
        let d_old = state.factors.d;

        // f = Uᵀ·hᵀ, v = D·f
        let h = row.as_matrix().transpose();
        let f: SVector<T, N> = u_old.transpose() * h;
        let mut v = SVector::<T, N>::zeros();
        for i in 0..N {
            v[i] = d_old[i] * f[i];
        }

        let mut u = u_old;
        let mut d = SVector::<T, N>::zeros();
        let mut k = SVector::<T, N>::zeros();

        let mut alpha = obs_var + f[0] * v[0];
        if alpha <= T::zero() {
            return Err(EstimError::NumericalInstability);
        }
        d[0] = d_old[0] * obs_var / alpha;
        k[0] = v[0];

        for j in 1..N {
            let alpha_prev = alpha;
            alpha += f[j] * v[j];
            if alpha <= T::zero() {
                return Err(EstimError::NumericalInstability);
            }
            d[j] = d_old[j] * alpha_prev / alpha;

            let lambda = -f[j] / alpha_prev;
            for i in 0..j {
                u[(i, j)] = u_old[(i, j)] + lambda * k[i];
                k[i] += v[j] * u_old[(i, j)];
            }
            k[j] = v[j];
        }

        let gain = k / alpha;
        let mean = StateVector::from_svector(state.mean.as_svector() + gain * residual);

        Ok(UdState {
            mean,
            factors: UdFactors { u, d },
        })
    }
}
