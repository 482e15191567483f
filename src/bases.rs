//! # Bases
//! Basis functions of the reduced force representation
//!
//! Implemented:
//! - `RadialBasis` (spatial), see [`radial::RadialBasis`]
//! - `BSplineBasis` (temporal), see [`bspline::BSplineBasis`]
//!
//! The force at node p and time t is a separable tensor product
//! $$
//! f(p, t) = \sum_b \sigma_b(p) \sum_k \tau_k(t) c_{b,k}
//! $$
pub mod bspline;
pub mod radial;
pub use bspline::BSplineBasis;
pub use radial::{Kernel, RadialBasis, SpatialBasisSet};
