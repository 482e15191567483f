//! # `elasinv`: Reduced space inversion for linear elastodynamics
//!
//! # Dependencies
//! - cargo >= v1.49
//! - `hdf5` (optional, sudo apt-get install -y libhdf5-dev)
//! - mpi installation and libclang (optional, feature `mpi`)
//!
//! # Details
//!
//! This library reconstructs time dependent body forces from observed
//! displacements. The force is represented in a reduced space, i.e. as
//! a tensor product of localized spatial basis functions and B-spline
//! basis functions in time,
//! $$
//! f(p, t) = \sum_b \sigma_b(p) \sum_k \tau_k(t) c_{b,k}
//! $$
//! and only the coefficients `c` are unknown. The inverse problem
//! $$
//! \min_c \frac{1}{2} \langle m (d - S E c), d - S E c \rangle_T + \frac{\beta}{2} |c|^2
//! $$
//! (`E` expansion, `S` forward solve, `m` observation mask)
//! is solved with one Newton step, using adjoint solves for the
//! gradient and matrix free Hessian-vector products inside a
//! conjugate gradient method.
//!
//! Building blocks:
//! - Bases, see [`bases::SpatialBasisSet`] and [`bases::BSplineBasis`]
//! - Expansion and reduction, see [`projector::FieldProjector`]
//! - Gradient, see [`inverse::compute_gradient`]
//! - Hessian, see [`inverse::ReducedHessian`]
//! - Driver, see [`inverse::InversionDriver`]
//!
//! The forward model is anything that implements [`TimeStepper`]. A
//! central difference reference integrator is found in
//! [`newmark::Newmark`].
//!
//! # Example
//! Recover a force from synthetic observations
//! ```
//! use elasinv::bases::{BSplineBasis, Kernel, SpatialBasisSet};
//! use elasinv::comm::SerialComm;
//! use elasinv::inverse::InversionDriver;
//! use elasinv::layout::{GridLayout, Layout};
//! use elasinv::newmark::{Material, Newmark};
//! use elasinv::projector::FieldProjector;
//! use elasinv::solver::CgConfig;
//! use elasinv::types::{SolveMode, TimeInfo};
//! use elasinv::TimeStepper;
//! use ndarray::{array, Array2};
//!
//! let layout: Layout = GridLayout::new([3, 3, 3]).unwrap().into();
//! let time = TimeInfo::new(0., 1., 0.1).unwrap();
//! let stepper = Newmark::new(layout.clone(), time, 1, Material::default()).unwrap();
//! let spatial = SpatialBasisSet::lattice(1, Kernel::Gaussian);
//! let temporal = BSplineBasis::new(1, 2).unwrap();
//!
//! // observations generated with the same model
//! let truth = array![1., -1.];
//! let projector = FieldProjector::new(
//!     spatial.clone(),
//!     temporal.clone(),
//!     &layout,
//!     time,
//!     1,
//!     Box::new(SerialComm),
//! )
//! .unwrap();
//! let zero = Array2::zeros((27, 1));
//! let obs = stepper
//!     .solve(
//!         &projector.expand(&truth).unwrap(),
//!         zero.view(),
//!         zero.view(),
//!         SolveMode::Forward,
//!     )
//!     .unwrap();
//!
//! let mut driver = InversionDriver::new(Box::new(stepper));
//! driver.set_basis(spatial, temporal).unwrap();
//! driver.set_regularization(1e-10).unwrap();
//! driver.set_observations(obs).unwrap();
//! driver
//!     .set_solver_config(CgConfig {
//!         rtol: 1e-12,
//!         ..CgConfig::default()
//!     })
//!     .unwrap();
//! driver.init().unwrap();
//! let report = driver.solve().unwrap();
//! assert!(report.cg.converged);
//! let control = driver.finish().unwrap();
//! assert!((control[0] - 1.).abs() < 1e-4);
//! assert!((control[1] + 1.).abs() < 1e-4);
//! ```
//!
//! ## Documentation
//!
//! Download and run:
//!
//! `cargo doc --open`
#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#[macro_use]
extern crate enum_dispatch;
pub mod bases;
pub mod comm;
pub mod config;
pub mod error;
pub mod field;
pub mod functions;
pub mod inverse;
#[cfg(feature = "hdf5")]
pub mod io;
pub mod layout;
pub mod newmark;
pub mod projector;
pub mod solver;
pub mod types;

pub use error::{InverseError, Result};
pub use field::FieldTrajectory;
use layout::Layout;
use ndarray::ArrayView2;
use types::{SolveMode, TimeInfo};

/// Forward and adjoint solver of the elastodynamic system.
///
/// Implementors integrate on the nodes of their [`Layout`] over the
/// snapshots given by their [`TimeInfo`].
pub trait TimeStepper {
    /// Time bounds and step size
    fn time_info(&self) -> TimeInfo;

    /// Nodes owned by this worker
    fn layout(&self) -> &Layout;

    /// Degrees of freedom per node
    fn dof(&self) -> usize;

    /// Integrate with the given forcing and initial conditions.
    ///
    /// In [`SolveMode::Adjoint`] the solve must be the discrete
    /// transpose of the forward solve with zero initial conditions,
    /// otherwise gradient and Hessian are inconsistent.
    ///
    /// # Errors
    /// Shapes do not match or the solve failed.
    fn solve(
        &self,
        forcing: &FieldTrajectory,
        init_disp: ArrayView2<f64>,
        init_vel: ArrayView2<f64>,
        mode: SolveMode,
    ) -> Result<FieldTrajectory>;
}
