//! Gradient of the reduced objective with central finite differences,
//! i.e. perturb every control coefficient subsequently.
//! This needs two forward solves per coefficient and is much more
//! expensive than [`compute_gradient`](super::compute_gradient).
//! Use it for testing only.
use super::{objective, InverseContext};
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use ndarray::Array1;

/// Central difference gradient with perturbation `eps`
///
/// # Errors
/// `eps` not positive, wrong control length or a failing solve.
pub fn grad_fd(
    ctx: &InverseContext,
    control: &Array1<f64>,
    observations: &FieldTrajectory,
    eps: f64,
) -> Result<Array1<f64>> {
    if !(eps > 0.) {
        return Err(InverseError::Config(format!(
            "perturbation must be positive, got {}",
            eps
        )));
    }
    ctx.projector().parameter_layout().check(control.len())?;
    let mut grad = Array1::zeros(control.len());
    let mut pert = control.clone();
    for i in 0..control.len() {
        pert[i] = control[i] + eps;
        let j_plus = objective(ctx, &pert, observations)?;
        pert[i] = control[i] - eps;
        let j_minus = objective(ctx, &pert, observations)?;
        pert[i] = control[i];
        grad[i] = (j_plus - j_minus) / (2. * eps);
        log::trace!("fd gradient {:>4}: {:.6e}", i, grad[i]);
    }
    Ok(grad)
}
