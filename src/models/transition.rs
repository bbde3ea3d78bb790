//! Transition (motion) models for target dynamics
//!
//! Describes how the target evolves over time. Trajectory integration under
//! gravity and drag lives outside this crate; the filters only need the
//! pieces below: the transition matrix, a propagation hook, and the
//! process-noise mapping. The SRIF additionally needs the inverse transition
//! and the square-root information of the driving noise.

use nalgebra::{RealField, SMatrix};
use num_traits::Float;

use crate::types::spaces::{StateCovariance, StateVector};
use crate::types::transforms::TransitionMatrix;

/// Trait for motion models with `W` independent white-noise channels.
///
/// Describes target dynamics in the form:
/// x_{k+1} = f(x_k) + G * w
///
/// where:
/// - f is the (possibly nonlinear) propagation function with Jacobian F
/// - G maps the `W`-channel acceleration noise into state space
/// - w is zero-mean white noise with per-channel variance q
pub trait MotionModel<T: RealField + Copy, const N: usize, const W: usize> {
    /// Returns the state transition matrix for time step dt.
    fn transition_matrix(&self, dt: T) -> TransitionMatrix<T, N>;

    /// Returns the inverse state transition matrix for time step dt.
    ///
    /// The SRIF maps its information array backwards through the dynamics,
    /// so the inverse is part of the model rather than recomputed
    /// numerically each step.
    fn inverse_transition_matrix(&self, dt: T) -> TransitionMatrix<T, N>;

    /// Propagates the state through one time step.
    ///
    /// Linear models apply the transition matrix; nonlinear models override
    /// this with the full propagation and supply the Jacobian via
    /// [`MotionModel::transition_matrix`].
    fn propagate(&self, state: &StateVector<T, N>, dt: T) -> StateVector<T, N> {
        self.transition_matrix(dt).apply_state(state)
    }

    /// Returns the kinematic noise mapping G for time step dt.
    fn noise_mapping(&self, dt: T) -> SMatrix<T, N, W>;

    /// Per-channel white-noise variance q.
    fn noise_variance(&self) -> T;

    /// Per-channel square-root information of the driving noise, `1/√q`.
    fn noise_sqrt_info(&self) -> T;

    /// Returns the process noise covariance `Q = G·q·Gᵀ` for time step dt.
    fn process_noise(&self, dt: T) -> StateCovariance<T, N> {
        let g = self.noise_mapping(dt);
        StateCovariance::from_matrix(g * g.transpose() * self.noise_variance())
    }
}

// ============================================================================
// Constant Velocity Model
// ============================================================================

/// Constant velocity model in 3D.
///
/// State: [rx, ry, rz, vx, vy, vz]; three independent acceleration-noise
/// channels, one per axis.
#[derive(Debug, Clone)]
pub struct ConstantVelocity3D<T: RealField> {
    /// Process noise intensity (acceleration standard deviation)
    pub sigma_a: T,
}

impl<T: RealField + Float + Copy> ConstantVelocity3D<T> {
    /// Creates a new constant velocity model.
    ///
    /// # Arguments
    /// - `sigma_a`: acceleration noise standard deviation (must be > 0; the
    ///   SRIF whitens the driving noise by `1/sigma_a`)
    ///
    /// # Panics
    /// Panics if `sigma_a <= 0`.
    pub fn new(sigma_a: T) -> Self {
        assert!(
            sigma_a > T::zero(),
            "Process noise sigma_a must be positive"
        );
        Self { sigma_a }
    }
}

impl<T: RealField + Float + Copy> MotionModel<T, 6, 3> for ConstantVelocity3D<T> {
    fn transition_matrix(&self, dt: T) -> TransitionMatrix<T, 6> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let mut f = SMatrix::<T, 6, 6>::identity();
        for i in 0..3 {
            f[(i, i + 3)] = dt;
        }
        TransitionMatrix::from_matrix(f)
    }

    fn inverse_transition_matrix(&self, dt: T) -> TransitionMatrix<T, 6> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let mut f = SMatrix::<T, 6, 6>::identity();
        for i in 0..3 {
            f[(i, i + 3)] = -dt;
        }
        TransitionMatrix::from_matrix(f)
    }

    fn noise_mapping(&self, dt: T) -> SMatrix<T, 6, 3> {
        let half = T::from_f64(0.5).unwrap();
        let mut g = SMatrix::<T, 6, 3>::zeros();
        for i in 0..3 {
            g[(i, i)] = half * dt * dt;
            g[(i + 3, i)] = dt;
        }
        g
    }

    fn noise_variance(&self) -> T {
        self.sigma_a * self.sigma_a
    }

    fn noise_sqrt_info(&self) -> T {
        T::one() / self.sigma_a
    }
}
