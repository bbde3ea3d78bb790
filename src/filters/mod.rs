//! Recursive estimation filters
//!
//! Four variants of the same tracking recursion in different numerical
//! forms:
//!
//! - [`kalman`]: linearized covariance-form Kalman filter
//! - [`schmidt`]: Schmidt-Kalman consider-parameter filter
//! - [`ud`]: U-D factorized sequential filter (Bierman/Thornton)
//! - [`srif`]: square-root information filter, plain and bias-augmented
//!
//! The variants share the motion and observation models and are run one
//! after another over the same measurement stream for comparison; they own
//! no shared mutable state.

pub mod kalman;
pub mod schmidt;
pub mod ud;
#[cfg(feature = "alloc")]
pub mod srif;
