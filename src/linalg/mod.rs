//! Numerical linear-algebra kernel
//!
//! Triangular inversion, symmetric square roots, U-D factorization,
//! Householder triangularization, and Mahalanobis distance. These are the
//! primitives every filter variant builds on; they operate on raw
//! `nalgebra` matrices rather than the typed wrappers.

mod triangular;
mod factorize;
mod householder;
mod stats;

pub use triangular::*;
pub use factorize::*;
pub use householder::*;
pub use stats::*;
