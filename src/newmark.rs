//! # Reference time stepper
//!
//! Explicit Newmark scheme (beta = 0, gamma = 1/2), i.e. central
//! differences, for
//! $$
//! M \ddot{u} + \alpha M \dot{u} + K u = f
//! $$
//! with lumped diagonal mass `M`, mass proportional damping and a
//! graph laplacian stiffness `K` assembled from the neighbours of a
//! [`Layout`](crate::layout::Layout). Every degree of freedom is
//! integrated with the same scalar operator.
//!
//! The adjoint solve is the exact discrete transpose of the forward
//! solve, see [`integrator::Newmark`].
pub mod integrator;
pub mod stiffness;
pub use integrator::Newmark;
use serde::{Deserialize, Serialize};
pub use stiffness::assemble_stiffness;

/// Homogeneous material parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Nodal mass density
    pub density: f64,
    /// Shear like stiffness, scales the laplacian weights
    pub stiffness: f64,
    /// Mass proportional damping coefficient alpha
    pub damping: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.,
            stiffness: 0.1,
            damping: 0.,
        }
    }
}
