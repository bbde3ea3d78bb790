//! SQTRACK: Square-Root Tracking Filters
//!
//! A family of recursive state estimators for tracking a single moving object
//! from range (and optionally bearing) measurements taken by fixed trackers,
//! under partially unknown tracker-position bias.
//!
//! # Filter variants
//!
//! - **Linearized Kalman filter** ([`filters::kalman`]): the classic
//!   covariance-form recursion with scalar sequential updates.
//! - **Schmidt-Kalman consider filter** ([`filters::schmidt`]): accounts for
//!   uncertain nuisance parameters (tracker bias) without estimating them.
//! - **U-D factorized filter** ([`filters::ud`]): Bierman/Thornton recursion
//!   on the U·D·Uᵀ covariance factors.
//! - **SRIF** ([`filters::srif`]): square-root information filter via
//!   Householder triangularization, plain and bias-augmented.
//!
//! All variants implement mathematically equivalent recursions in different
//! numerical forms; the square-root forms exist to keep the covariance
//! symmetric and positive semi-definite under finite-precision arithmetic.
//!
//! # Features
//!
//! - **Type Safety**: state, measurement, and consider spaces are encoded in
//!   the type system; dimension mismatches are caught at compile time
//! - **no_std Support**: all filter state is statically sized

#![cfg_attr(not(feature = "std"), no_std)]

pub mod types;
pub mod linalg;
pub mod models;
pub mod init;
pub mod filters;

pub mod prelude {
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::linalg::*;
    pub use crate::models::*;
    pub use crate::filters::kalman::*;
    pub use crate::filters::schmidt::*;
    pub use crate::filters::ud::*;
    #[cfg(feature = "alloc")]
    pub use crate::filters::srif::*;
    pub use crate::init::*;
}

/// Error types for the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimError {
    /// Triangular matrix has a zero diagonal entry and cannot be inverted
    SingularMatrix,
    /// Matrix expected to be positive semi-definite is not
    NotPositiveSemiDefinite,
    /// Tracker and target coincide; the observation Jacobian is undefined
    DegenerateGeometry,
    /// Numerical computation became unstable
    NumericalInstability,
}

#[cfg(feature = "std")]
impl std::error::Error for EstimError {}

impl ::core::fmt::Display for EstimError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            EstimError::SingularMatrix => write!(f, "Matrix is singular"),
            EstimError::NotPositiveSemiDefinite => {
                write!(f, "Matrix is not positive semi-definite")
            }
            EstimError::DegenerateGeometry => {
                write!(f, "Degenerate geometry: tracker and target coincide")
            }
            EstimError::NumericalInstability => write!(f, "Numerical instability detected"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, EstimError>;
