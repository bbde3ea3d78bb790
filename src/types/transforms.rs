//! Typed transformation matrices
//!
//! Matrices that transform vectors between spaces, with type-level
//! encoding of source and target spaces. The filters here consume scalar
//! observations one row at a time, so the observation-side helpers are
//! specialized to single Jacobian rows.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, Scalar};

use super::spaces::{
    ConsiderSpace, InnovationSpace, MeasurementSpace, StateCovariance, StateSpace, StateVector,
    Vector,
};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A transformation matrix that maps vectors from one space to another.
///
/// # Type Parameters
///
/// - `T`: Scalar type
/// - `ROWS`: Number of rows (dimension of target space)
/// - `COLS`: Number of columns (dimension of source space)
/// - `To`: Target space marker
/// - `From`: Source space marker
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    /// Creates a transform from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }

    /// Consumes self and returns the underlying matrix.
    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, ROWS, COLS> {
        self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where SMatrix<T, ROWS, COLS>: Copy {}

impl<T: RealField + Copy, const ROWS: usize, const COLS: usize, To, From>
    Transform<T, ROWS, COLS, To, From>
{
    /// Creates a zero transform.
    #[inline]
    pub fn zeros() -> Self {
        Self {
            inner: SMatrix::zeros(),
            _marker: PhantomData,
        }
    }

    /// Returns the transpose of this transform.
    ///
    /// The transpose maps from `To` to `From` (reversed).
    #[inline]
    pub fn transpose(&self) -> Transform<T, COLS, ROWS, From, To> {
        Transform {
            inner: self.inner.transpose(),
            _marker: PhantomData,
        }
    }

    /// Applies the transformation to a vector.
    #[inline]
    pub fn apply(&self, v: &Vector<T, COLS, From>) -> Vector<T, ROWS, To> {
        Vector::from_svector(self.inner * v.as_svector())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// State transition matrix: StateSpace -> StateSpace
pub type TransitionMatrix<T, const N: usize> = Transform<T, N, N, StateSpace, StateSpace>;

/// A single observation Jacobian row: StateSpace -> MeasurementSpace (scalar)
pub type ObservationRow<T, const N: usize> = Transform<T, 1, N, MeasurementSpace, StateSpace>;

/// A single observation Jacobian row with respect to the consider parameters.
pub type ConsiderRow<T, const P: usize> = Transform<T, 1, P, MeasurementSpace, ConsiderSpace>;

/// Kalman gain for a scalar observation: InnovationSpace -> StateSpace
pub type KalmanGain<T, const N: usize> = Transform<T, N, 1, StateSpace, InnovationSpace>;

/// Cross-covariance between state and consider parameters (SigmaXY).
pub type CrossCovariance<T, const N: usize, const P: usize> =
    Transform<T, N, P, StateSpace, ConsiderSpace>;

// ============================================================================
// Specific Transform Applications
// ============================================================================

impl<T: RealField + Copy, const N: usize> TransitionMatrix<T, N> {
    /// Creates an identity transition matrix.
    #[inline]
    pub fn identity() -> Self {
        Self {
            inner: SMatrix::identity(),
            _marker: PhantomData,
        }
    }

    /// Applies the transition to a state vector.
    #[inline]
    pub fn apply_state(&self, state: &StateVector<T, N>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * state.as_svector())
    }

    /// Propagates a covariance matrix: F * P * F^T
    #[inline]
    pub fn propagate_covariance(&self, cov: &StateCovariance<T, N>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize> ObservationRow<T, N> {
    /// Creates an observation row from state-vector components.
    #[inline]
    pub fn from_row(row: [T; N]) -> Self {
        Self::from_matrix(SMatrix::<T, 1, N>::from_row_slice(&row))
    }

    /// Evaluates the linearized observation: h · x (scalar).
    #[inline]
    pub fn observe(&self, state: &StateVector<T, N>) -> T {
        (self.inner * state.as_svector())[(0, 0)]
    }
}

impl<T: RealField + Copy, const P: usize> ConsiderRow<T, P> {
    /// Creates a consider-parameter Jacobian row from components.
    #[inline]
    pub fn from_row(row: [T; P]) -> Self {
        Self::from_matrix(SMatrix::<T, 1, P>::from_row_slice(&row))
    }
}

impl<T: RealField + Copy, const N: usize> KalmanGain<T, N> {
    /// Applies the gain to a scalar innovation.
    #[inline]
    pub fn correct(&self, residual: T) -> StateVector<T, N> {
        StateVector::from_svector(self.inner.column(0).into_owned() * residual)
    }
}

// ============================================================================
// Scalar-Observation Kalman Algebra
// ============================================================================

/// Computes the scalar innovation variance `s = h·P·hᵀ + r`.
#[inline]
pub fn scalar_innovation_variance<T: RealField + Copy, const N: usize>(
    cov: &StateCovariance<T, N>,
    row: &ObservationRow<T, N>,
    obs_var: T,
) -> T {
    let h = row.as_matrix();
    (h * cov.as_matrix() * h.transpose())[(0, 0)] + obs_var
}

/// Computes the scalar-observation Kalman gain `k = P·hᵀ / s`.
///
/// Returns `None` if the innovation variance is not strictly positive.
pub fn scalar_kalman_gain<T: RealField + Copy, const N: usize>(
    cov: &StateCovariance<T, N>,
    row: &ObservationRow<T, N>,
    innovation_var: T,
) -> Option<KalmanGain<T, N>> {
    if innovation_var <= T::zero() {
        return None;
    }
    let k = cov.as_matrix() * row.as_matrix().transpose() / innovation_var;
    Some(KalmanGain::from_matrix(k))
}

/// Updates state covariance using Joseph form for numerical stability.
///
/// P_updated = (I - k*h) * P * (I - k*h)^T + k * r * k^T
pub fn joseph_update<T: RealField + Copy, const N: usize>(
    cov: &StateCovariance<T, N>,
    gain: &KalmanGain<T, N>,
    row: &ObservationRow<T, N>,
    obs_var: T,
) -> StateCovariance<T, N> {
    let i: SMatrix<T, N, N> = SMatrix::identity();
    let k_h = gain.as_matrix() * row.as_matrix();
    let i_kh = i - k_h;

    let term1 = i_kh * cov.as_matrix() * i_kh.transpose();
    let term2 = gain.as_matrix() * gain.as_matrix().transpose() * obs_var;

    StateCovariance::from_matrix(term1 + term2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        // 3D constant velocity
        let dt = 1.0_f64;
        let mut f = SMatrix::<f64, 6, 6>::identity();
        for i in 0..3 {
            f[(i, i + 3)] = dt;
        }
        let f = TransitionMatrix::from_matrix(f);

        let state = StateVector::from_array([0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        let predicted = f.apply_state(&state);

        assert!((predicted.index(0) - 1.0).abs() < 1e-10);
        assert!((predicted.index(1) - 2.0).abs() < 1e-10);
        assert!((predicted.index(2) - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_observation_row() {
        // Observe rx only
        let h = ObservationRow::<f64, 6>::from_row([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let state = StateVector::from_array([10.0, 20.0, 30.0, 1.0, 2.0, 3.0]);
        assert!((h.observe(&state) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_scalar_gain_and_joseph() {
        let cov: StateCovariance<f64, 2> = StateCovariance::identity();
        let h = ObservationRow::<f64, 2>::from_row([1.0, 0.0]);
        let r = 1.0;

        let s = scalar_innovation_variance(&cov, &h, r);
        assert!((s - 2.0).abs() < 1e-12);

        let k = scalar_kalman_gain(&cov, &h, s).unwrap();
        assert!((k.as_matrix()[(0, 0)] - 0.5).abs() < 1e-12);

        let updated = joseph_update(&cov, &k, &h, r);
        // Observed component variance halves, unobserved untouched.
        assert!((updated.as_matrix()[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((updated.as_matrix()[(1, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gain_rejects_nonpositive_variance() {
        let cov: StateCovariance<f64, 2> = StateCovariance::identity();
        let h = ObservationRow::<f64, 2>::from_row([1.0, 0.0]);
        assert!(scalar_kalman_gain(&cov, &h, 0.0).is_none());
    }
}
