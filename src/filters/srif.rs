//! Square-Root Information Filter (SRIF)
//!
//! Carries the information array `(R, b)` — `R` upper triangular with
//! `RᵀR = P⁻¹`, `b` the whitened state differential — instead of a
//! covariance. Every predict and update is a single orthogonal
//! triangularization of a stacked block array, so the implied covariance
//! can never go asymmetric or indefinite.
//!
//! Unlike the U-D filter, the measurement update consumes a full
//! observation *set* per call: the whitened Jacobian/residual rows are
//! stacked beneath the information array and triangularized in one pass.
//!
//! Residuals are differentials from the current linearization point. The
//! filter re-linearizes at the propagated state each step: the correction
//! `R·δx = b` is applied to the mean and `b` is zeroed, rather than
//! accumulating a running total state in information space.
//!
//! The bias-augmented variant additionally carries a bias information
//! array `(Ry, by)` and cross block `Rxy` for consider parameters that are
//! never estimated, with covariance recovery selectable between the Tapley
//! and Bierman methods.
//!
//! This module works over the concrete tracking dimensions (6-state,
//! 3-channel noise, 3 bias parameters): the stacked scratch arrays have
//! block-sum dimensions that const generics cannot express today.

use core::marker::PhantomData;

use nalgebra::{Cholesky, DMatrix, RealField, SMatrix, SVector};
use num_traits::Float;

use crate::linalg::{back_substitute, triangular_inverse_upper, triangularize};
use crate::models::MotionModel;
use crate::types::spaces::{ConsiderCovariance, StateCovariance, StateVector};
use crate::types::transforms::{ConsiderRow, ObservationRow};
use crate::{EstimError, Result};

/// State dimension of the tracking problem (position + velocity).
pub const STATE_DIM: usize = 6;
/// Independent process-noise channels (one per axis).
pub const NOISE_DIM: usize = 3;
/// Consider (tracker-bias) parameters.
pub const BIAS_DIM: usize = 3;

/// A single whitenable scalar observation for the SRIF set update.
#[derive(Debug, Clone)]
pub struct SrifObservation<T: RealField> {
    /// Observation Jacobian row linearized at the predicted state
    pub row: ObservationRow<T, STATE_DIM>,
    /// Measurement residual `z - h(x̄)`
    pub residual: T,
    /// Observation noise standard deviation (must be > 0)
    pub sigma: T,
}

/// A scalar observation carrying both state and bias Jacobian rows.
#[derive(Debug, Clone)]
pub struct BiasSrifObservation<T: RealField> {
    /// Observation Jacobian row with respect to the state
    pub row: ObservationRow<T, STATE_DIM>,
    /// Observation Jacobian row with respect to the bias parameters
    pub bias_row: ConsiderRow<T, BIAS_DIM>,
    /// Measurement residual `z - h(x̄)`
    pub residual: T,
    /// Observation noise standard deviation (must be > 0)
    pub sigma: T,
}

// ============================================================================
// Information Array
// ============================================================================

/// The information array `(R, b)`: `R` upper triangular with positive
/// diagonal satisfying `RᵀR = P⁻¹`, and `b` the whitened differential
/// residual with `R·δx = b`.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationArray<T: RealField> {
    /// Square root of the inverse covariance (upper triangular)
    pub r: SMatrix<T, STATE_DIM, STATE_DIM>,
    /// Whitened state differential
    pub b: SVector<T, STATE_DIM>,
}

impl<T: RealField + Float + Copy> InformationArray<T> {
    /// Builds the information array from an a priori covariance, with a
    /// zero differential.
    ///
    /// # Errors
    /// Returns [`EstimError::NotPositiveSemiDefinite`] if the covariance
    /// is not positive definite.
    pub fn from_covariance(covariance: &StateCovariance<T, STATE_DIM>) -> Result<Self> {
        let r = sqrt_information(covariance.as_matrix())?;
        Ok(Self {
            r,
            b: SVector::zeros(),
        })
    }

    /// Recovers the covariance from the triangular factor: `P = R⁻¹·R⁻ᵀ`.
    pub fn covariance(&self) -> Result<StateCovariance<T, STATE_DIM>> {
        let r_inv = triangular_inverse_upper(&self.r)?;
        Ok(StateCovariance::from_matrix(r_inv * r_inv.transpose()))
    }

    /// Solves `R·δx = b` for the state correction.
    pub fn state_correction(&self) -> Result<SVector<T, STATE_DIM>> {
        back_substitute(&self.r, &self.b)
    }
}

/// Computes the upper-triangular square-root information factor of a
/// positive-definite covariance.
fn sqrt_information<T: RealField + Copy, const N: usize>(
    p: &SMatrix<T, N, N>,
) -> Result<SMatrix<T, N, N>> {
    let chol = Cholesky::new(*p).ok_or(EstimError::NotPositiveSemiDefinite)?;
    let p_inv = chol.inverse();
    let chol_inv = Cholesky::new(p_inv).ok_or(EstimError::NotPositiveSemiDefinite)?;
    Ok(chol_inv.l().transpose())
}

/// Flips rows with negative pivots so the triangular factor keeps a
/// positive diagonal (a row sign change is itself orthogonal).
fn normalize_rows<T, R, C, S>(a: &mut nalgebra::Matrix<T, R, C, S>, rows: core::ops::Range<usize>)
where
    T: RealField + Copy,
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::storage::StorageMut<T, R, C>,
{
    let ncols = a.ncols();
    for i in rows {
        if a[(i, i)] < T::zero() {
            for j in 0..ncols {
                a[(i, j)] = -a[(i, j)];
            }
        }
    }
}

// ============================================================================
// Plain SRIF
// ============================================================================

/// SRIF state: mean at the current linearization point plus the
/// information array of the differential.
#[derive(Debug, Clone, PartialEq)]
pub struct SrifState<T: RealField> {
    /// State estimate mean (linearization point)
    pub mean: StateVector<T, STATE_DIM>,
    /// Information array of the state differential
    pub info: InformationArray<T>,
}

impl<T: RealField + Float + Copy> SrifState<T> {
    /// Initializes the filter state from an a priori mean and covariance.
    pub fn from_covariance(
        mean: StateVector<T, STATE_DIM>,
        covariance: &StateCovariance<T, STATE_DIM>,
    ) -> Result<Self> {
        Ok(Self {
            mean,
            info: InformationArray::from_covariance(covariance)?,
        })
    }
}

/// A square-root information filter over the 6-state tracking problem.
#[derive(Debug, Clone)]
pub struct SrifFilter<T, M>
where
    T: RealField + Copy,
    M: MotionModel<T, STATE_DIM, NOISE_DIM>,
{
    /// Motion model supplying inverse transition, noise mapping, and the
    /// driving-noise square-root information
    pub motion: M,
    _marker: PhantomData<T>,
}

impl<T, M> SrifFilter<T, M>
where
    T: RealField + Float + Copy,
    M: MotionModel<T, STATE_DIM, NOISE_DIM>,
{
    /// Creates a new filter around the given motion model.
    #[inline]
    pub fn new(motion: M) -> Self {
        Self {
            motion,
            _marker: PhantomData,
        }
    }

    /// Performs the information-array prediction step.
    ///
    /// Builds the augmented array
    ///
    /// ```text
    /// [ Rw      0    0 ]
    /// [ -Rd·G   Rd   b ]      Rd = R·Φ⁻¹
    /// ```
    ///
    /// and triangularizes it, extracting the propagated `(R, b)` from the
    /// lower-right blocks. The driving noise has zero mean, so a zero `b`
    /// stays zero through the predict.
    pub fn predict(&self, state: &SrifState<T>, dt: T) -> SrifState<T> {
        const W: usize = NOISE_DIM;
        const N: usize = STATE_DIM;

        let mean = self.motion.propagate(&state.mean, dt);

        let phi_inv = self.motion.inverse_transition_matrix(dt);
        let rd = state.info.r * phi_inv.as_matrix();
        let g = self.motion.noise_mapping(dt);
        let rw = self.motion.noise_sqrt_info();

        let mut a = SMatrix::<T, { W + N }, { W + N + 1 }>::zeros();
        for i in 0..W {
            a[(i, i)] = rw;
        }
        a.fixed_view_mut::<N, W>(W, 0).copy_from(&(-rd * g));
        a.fixed_view_mut::<N, N>(W, W).copy_from(&rd);
        a.fixed_view_mut::<N, 1>(W, W + N)
            .copy_from(&state.info.b);

        triangularize(&mut a);
        normalize_rows(&mut a, W..W + N);

        let r = a.fixed_view::<N, N>(W, W).into_owned();
        let b = a.fixed_view::<N, 1>(W, W + N).into_owned();

        SrifState {
            mean,
            info: InformationArray { r, b },
        }
    }

    /// Processes one observation set in a single triangularization pass.
    ///
    /// Stacks the whitened Jacobian/residual rows beneath `[R | b]`,
    /// triangularizes, applies the state correction `R·δx = b` to the
    /// mean, and zeroes `b` for the next linearization.
    ///
    /// # Errors
    /// Returns [`EstimError::SingularMatrix`] if the updated factor is
    /// singular (the state is unobservable from the data so far), or
    /// [`EstimError::NumericalInstability`] if an observation carries a
    /// non-positive `sigma` and cannot be whitened.
    pub fn update(&self, state: &SrifState<T>, observations: &[SrifObservation<T>]) -> Result<SrifState<T>> {
        const N: usize = STATE_DIM;
        let k = observations.len();

        let mut a = DMatrix::<T>::zeros(N + k, N + 1);
        a.fixed_view_mut::<N, N>(0, 0).copy_from(&state.info.r);
        a.fixed_view_mut::<N, 1>(0, N).copy_from(&state.info.b);

        for (idx, obs) in observations.iter().enumerate() {
            if obs.sigma <= T::zero() {
                return Err(EstimError::NumericalInstability);
            }
            let w = T::one() / obs.sigma;
            for j in 0..N {
                a[(N + idx, j)] = obs.row.as_matrix()[(0, j)] * w;
            }
            a[(N + idx, N)] = obs.residual * w;
        }

        triangularize(&mut a);
        normalize_rows(&mut a, 0..N);

        let r = a.fixed_view::<N, N>(0, 0).into_owned();
        let b = a.fixed_view::<N, 1>(0, N).into_owned();

        let info = InformationArray { r, b };
        let correction = info.state_correction()?;
        let mean = StateVector::from_svector(state.mean.as_svector() + correction);

        Ok(SrifState {
            mean,
            info: InformationArray {
                r,
                b: SVector::zeros(),
            },
        })
    }
}

// ============================================================================
// Bias-Augmented SRIF
// ============================================================================

/// Strategy for recovering the state covariance from the bias-augmented
/// information arrays.
///
/// Both methods are mathematically equivalent; Bierman's avoids inverting
/// the full augmented matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceRecovery {
    /// Invert the full augmented triangular system, then partition.
    Tapley,
    /// Invert the state and bias blocks separately and combine through the
    /// cross term: `P = Rx⁻¹·Rx⁻ᵀ + S·Py·Sᵀ` with `S = -Rx⁻¹·Rxy`.
    #[default]
    Bierman,
}

/// Bias-augmented SRIF state.
///
/// Carries the state information array `(Rx, bx)`, the parallel bias array
/// `(Ry, by)`, and the cross-coupling block `Rxy`. The bias is never
/// estimated: corrections are solved for the state alone with the bias
/// differential at its zero mean.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasSrifState<T: RealField> {
    /// State estimate mean (linearization point)
    pub mean: StateVector<T, STATE_DIM>,
    /// State square-root information (upper triangular)
    pub rx: SMatrix<T, STATE_DIM, STATE_DIM>,
    /// State-bias cross-coupling block
    pub rxy: SMatrix<T, STATE_DIM, BIAS_DIM>,
    /// Whitened state differential
    pub bx: SVector<T, STATE_DIM>,
    /// Bias square-root information (upper triangular)
    pub ry: SMatrix<T, BIAS_DIM, BIAS_DIM>,
    /// Whitened bias differential
    pub by: SVector<T, BIAS_DIM>,
}

impl<T: RealField + Float + Copy> BiasSrifState<T> {
    /// Initializes the augmented arrays from a priori state and bias
    /// covariances, with zero cross-coupling and zero differentials.
    ///
    /// # Errors
    /// Returns [`EstimError::NotPositiveSemiDefinite`] if either
    /// covariance is not positive definite. The bias covariance must be
    /// strictly positive definite: a bias known exactly has no square-root
    /// information representation (use the plain SRIF instead).
    pub fn from_covariances(
        mean: StateVector<T, STATE_DIM>,
        covariance: &StateCovariance<T, STATE_DIM>,
        bias_covariance: &ConsiderCovariance<T, BIAS_DIM>,
    ) -> Result<Self> {
        Ok(Self {
            mean,
            rx: sqrt_information(covariance.as_matrix())?,
            rxy: SMatrix::zeros(),
            bx: SVector::zeros(),
            ry: sqrt_information(bias_covariance.as_matrix())?,
            by: SVector::zeros(),
        })
    }
}

/// A bias-augmented (consider) square-root information filter.
#[derive(Debug, Clone)]
pub struct BiasSrifFilter<T, M>
where
    T: RealField + Copy,
    M: MotionModel<T, STATE_DIM, NOISE_DIM>,
{
    /// Motion model supplying inverse transition, noise mapping, and the
    /// driving-noise square-root information
    pub motion: M,
    /// Covariance recovery strategy
    pub recovery: CovarianceRecovery,
    _marker: PhantomData<T>,
}

impl<T, M> BiasSrifFilter<T, M>
where
    T: RealField + Float + Copy,
    M: MotionModel<T, STATE_DIM, NOISE_DIM>,
{
    /// Creates a new filter with the given covariance recovery strategy.
    #[inline]
    pub fn new(motion: M, recovery: CovarianceRecovery) -> Self {
        Self {
            motion,
            recovery,
            _marker: PhantomData,
        }
    }

    /// Performs the bias-augmented prediction step.
    ///
    /// The bias is constant through the dynamics, so its columns pass
    /// through the transition unchanged and its own array `(Ry, by)` is
    /// untouched: the augmented transition is `diag(Φ, I)` and the process
    /// noise enters the state block only.
    pub fn predict(&self, state: &BiasSrifState<T>, dt: T) -> BiasSrifState<T> {
        const W: usize = NOISE_DIM;
        const N: usize = STATE_DIM;
        const P: usize = BIAS_DIM;

        let mean = self.motion.propagate(&state.mean, dt);

        let phi_inv = self.motion.inverse_transition_matrix(dt);
        let rd = state.rx * phi_inv.as_matrix();
        let g = self.motion.noise_mapping(dt);
        let rw = self.motion.noise_sqrt_info();

        let mut a = SMatrix::<T, { W + N }, { W + N + P + 1 }>::zeros();
        for i in 0..W {
            a[(i, i)] = rw;
        }
        a.fixed_view_mut::<N, W>(W, 0).copy_from(&(-rd * g));
        a.fixed_view_mut::<N, N>(W, W).copy_from(&rd);
        a.fixed_view_mut::<N, P>(W, W + N).copy_from(&state.rxy);
        a.fixed_view_mut::<N, 1>(W, W + N + P).copy_from(&state.bx);

        triangularize(&mut a);
        normalize_rows(&mut a, W..W + N);

        BiasSrifState {
            mean,
            rx: a.fixed_view::<N, N>(W, W).into_owned(),
            rxy: a.fixed_view::<N, P>(W, W + N).into_owned(),
            bx: a.fixed_view::<N, 1>(W, W + N + P).into_owned(),
            ry: state.ry,
            by: state.by,
        }
    }

    /// Processes one observation set, updating the state, cross, and bias
    /// blocks in the same triangularization pass.
    ///
    /// The state correction is solved with the bias differential at its
    /// zero mean: `Rx·δx = bx`. Differentials are zeroed afterwards.
    ///
    /// # Errors
    /// Returns [`EstimError::SingularMatrix`] if the updated state factor
    /// is singular, or [`EstimError::NumericalInstability`] if an
    /// observation carries a non-positive `sigma` and cannot be whitened.
    pub fn update(
        &self,
        state: &BiasSrifState<T>,
        observations: &[BiasSrifObservation<T>],
    ) -> Result<BiasSrifState<T>> {
        const N: usize = STATE_DIM;
        const P: usize = BIAS_DIM;
        let k = observations.len();

        let mut a = DMatrix::<T>::zeros(N + P + k, N + P + 1);
        a.fixed_view_mut::<N, N>(0, 0).copy_from(&state.rx);
        a.fixed_view_mut::<N, P>(0, N).copy_from(&state.rxy);
        a.fixed_view_mut::<N, 1>(0, N + P).copy_from(&state.bx);
        a.fixed_view_mut::<P, P>(N, N).copy_from(&state.ry);
        a.fixed_view_mut::<P, 1>(N, N + P).copy_from(&state.by);

        for (idx, obs) in observations.iter().enumerate() {
            if obs.sigma <= T::zero() {
                return Err(EstimError::NumericalInstability);
            }
            let w = T::one() / obs.sigma;
            let i = N + P + idx;
            for j in 0..N {
                a[(i, j)] = obs.row.as_matrix()[(0, j)] * w;
            }
            for j in 0..P {
                a[(i, N + j)] = obs.bias_row.as_matrix()[(0, j)] * w;
            }
            a[(i, N + P)] = obs.residual * w;
        }

        triangularize(&mut a);
        normalize_rows(&mut a, 0..N + P);

        let rx = a.fixed_view::<N, N>(0, 0).into_owned();
        let rxy = a.fixed_view::<N, P>(0, N).into_owned();
        let bx = a.fixed_view::<N, 1>(0, N + P).into_owned();
        let ry = a.fixed_view::<P, P>(N, N).into_owned();

        let correction = back_substitute(&rx, &bx)?;
        let mean = StateVector::from_svector(state.mean.as_svector() + correction);

        Ok(BiasSrifState {
            mean,
            rx,
            rxy,
            bx: SVector::zeros(),
            ry,
            by: SVector::zeros(),
        })
    }

    /// Recovers the consider-inflated state covariance by the configured
    /// strategy.
    pub fn covariance(&self, state: &BiasSrifState<T>) -> Result<StateCovariance<T, STATE_DIM>> {
        const N: usize = STATE_DIM;
        const P: usize = BIAS_DIM;

        match self.recovery {
            CovarianceRecovery::Bierman => {
                let rx_inv = triangular_inverse_upper(&state.rx)?;
                let ry_inv = triangular_inverse_upper(&state.ry)?;
                let py = ry_inv * ry_inv.transpose();
                // Sensitivity of the state solution to the bias.
                let s = -rx_inv * state.rxy;
                Ok(StateCovariance::from_matrix(
                    rx_inv * rx_inv.transpose() + s * py * s.transpose(),
                ))
            }
            CovarianceRecovery::Tapley => {
                let mut aug = SMatrix::<T, { N + P }, { N + P }>::zeros();
                aug.fixed_view_mut::<N, N>(0, 0).copy_from(&state.rx);
                aug.fixed_view_mut::<N, P>(0, N).copy_from(&state.rxy);
                aug.fixed_view_mut::<P, P>(N, N).copy_from(&state.ry);

                let aug_inv = triangular_inverse_upper(&aug)?;
                let full = aug_inv * aug_inv.transpose();
                Ok(StateCovariance::from_matrix(
                    full.fixed_view::<N, N>(0, 0).into_owned(),
                ))
            }
        }
    }
}
