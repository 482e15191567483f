//! Value of the reduced objective
use super::InverseContext;
use crate::error::Result;
use crate::field::FieldTrajectory;
use ndarray::Array1;

/// J(c) = 1/2 <m (d - S E c), d - S E c>_T + beta/2 |c|^2.
///
/// One forward solve, the observations are left untouched.
///
/// # Errors
/// Wrong control length, observations not matching the time info
/// and layout, or a failing solve.
pub fn objective(
    ctx: &InverseContext,
    control: &Array1<f64>,
    observations: &FieldTrajectory,
) -> Result<f64> {
    let mut residual = ctx.forward(control)?;
    residual.scale(-1.);
    residual.scaled_add(1., observations)?;
    Ok(ctx.misfit(&residual) + ctx.regularization(control))
}
