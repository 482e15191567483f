//! Adjoint based gradient of the reduced objective
use super::InverseContext;
use crate::error::Result;
use crate::field::FieldTrajectory;
use ndarray::Array1;

/// Gradient together with the objective terms at the same control
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedGradient {
    /// dJ/dc
    pub gradient: Array1<f64>,
    /// 1/2 <m r, r>_T, r = d - S E c
    pub misfit: f64,
    /// beta/2 |c|^2
    pub regularization: f64,
}

impl ReducedGradient {
    /// Value of the objective, misfit + regularization
    pub fn objective(&self) -> f64 {
        self.misfit + self.regularization
    }
}

/// Gradient of the reduced objective at `control`.
///
/// 1. expand control and solve forward with the configured
///    initial conditions
/// 2. residual `r = d - u`, multiplied with the observation mask
/// 3. adjoint solve with forcing `r` and reduction
/// 4. `g = -reduce(adjoint) + beta c`
///
/// The observations are consumed, their buffer holds the residual.
///
/// # Errors
/// Wrong control length, observations not matching the time info
/// and layout, or a failing solve.
pub fn compute_gradient(
    ctx: &InverseContext,
    control: &Array1<f64>,
    observations: FieldTrajectory,
) -> Result<ReducedGradient> {
    let projector = ctx.projector();
    projector.parameter_layout().check(control.len())?;
    observations.check_shape(
        projector.time_info().num_snapshots(),
        projector.num_nodes(),
        projector.dof(),
    )?;

    let mut residual = observations;
    {
        let state = ctx.forward(control)?;
        residual.scaled_add(-1., &state)?;
    }
    let misfit = ctx.misfit(&residual);
    ctx.apply_mask(&mut residual)?;

    let adjoint = ctx.adjoint(&residual)?;
    drop(residual);
    let mut gradient = projector.reduce(&adjoint)?;
    gradient.mapv_inplace(|g| -g);
    gradient.scaled_add(ctx.beta(), control);

    let regularization = ctx.regularization(control);
    log::debug!(
        "gradient: misfit = {:.6e}, regularization = {:.6e}, |g| = {:.6e}",
        misfit,
        regularization,
        crate::functions::norm_l2(gradient.iter())
    );
    Ok(ReducedGradient {
        gradient,
        misfit,
        regularization,
    })
}
