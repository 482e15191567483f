//! # Inverse problem
//!
//! Reduced space Newton step for
//! $$
//! J(c) = \frac{1}{2} \langle m (d - S E c), d - S E c \rangle_T + \frac{\beta}{2} |c|^2
//! $$
//! where `E` is the expansion of the [`FieldProjector`](crate::projector::FieldProjector),
//! `S` the forward solve of a [`TimeStepper`](crate::TimeStepper), `d` the
//! observations and `m` an optional observation mask.
//!
//! - Gradient: [`compute_gradient`] (one forward, one adjoint solve)
//! - Hessian-vector product: [`ReducedHessian`] (one forward, one adjoint solve)
//! - Driver with state machine: [`InversionDriver`]
//! - Finite difference gradient for testing: [`grad_fd`]
pub mod context;
pub mod driver;
pub mod fd_grad;
pub mod gradient;
pub mod hessian;
pub mod objective;
pub use context::InverseContext;
pub use driver::{DriverState, InversionDriver, SolveReport};
pub use fd_grad::grad_fd;
pub use gradient::{compute_gradient, ReducedGradient};
pub use hessian::ReducedHessian;
pub use objective::objective;
