//! Motion and observation models
//!
//! The motion model seam the external trajectory integrator plugs into, and
//! the tracker-geometry observation model shared by all filter variants.

mod transition;
mod observation;

pub use transition::*;
pub use observation::*;
