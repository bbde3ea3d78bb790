//! Type-safe vectors, covariances, and transformation matrices

pub mod spaces;
pub mod transforms;
