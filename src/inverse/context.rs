//! Configuration shared by gradient and Hessian
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use crate::layout::NodeLayout;
use crate::projector::FieldProjector;
use crate::types::SolveMode;
use crate::TimeStepper;
use ndarray::{Array1, Array2, ArrayView2, Zip};

/// Everything gradient and Hessian evaluations need, except
/// the current iterate and the observations.
pub struct InverseContext {
    projector: FieldProjector,
    stepper: Box<dyn TimeStepper>,
    beta: f64,
    mask: Option<Array2<f64>>,
    init_disp: Array2<f64>,
    init_vel: Array2<f64>,
    zero: Array2<f64>,
}

impl InverseContext {
    /// Return context with zero initial conditions and without mask
    ///
    /// # Errors
    /// Projector and time stepper disagree on time info, node count or
    /// degrees of freedom, or `beta` is negative.
    pub fn new(
        projector: FieldProjector,
        stepper: Box<dyn TimeStepper>,
        beta: f64,
    ) -> Result<Self> {
        if !(beta >= 0. && beta.is_finite()) {
            return Err(InverseError::Config(format!(
                "regularization must be non-negative, got {}",
                beta
            )));
        }
        if projector.time_info() != stepper.time_info() {
            return Err(InverseError::Config(format!(
                "time info of projector {:?} differs from time stepper {:?}",
                projector.time_info(),
                stepper.time_info()
            )));
        }
        let shape = (stepper.layout().num_nodes(), stepper.dof());
        if (projector.num_nodes(), projector.dof()) != shape {
            return Err(InverseError::FieldShape {
                expected: vec![shape.0, shape.1],
                found: vec![projector.num_nodes(), projector.dof()],
            });
        }
        let zero = Array2::zeros(shape);
        Ok(Self {
            projector,
            stepper,
            beta,
            mask: None,
            init_disp: zero.clone(),
            init_vel: zero.clone(),
            zero,
        })
    }

    /// Restrict the misfit to the support of `mask`, shape (nodes, dof)
    ///
    /// # Errors
    /// Wrong shape or negative entries.
    pub fn with_mask(mut self, mask: Array2<f64>) -> Result<Self> {
        check_mask(&mask.view(), self.zero.dim())?;
        self.mask = Some(mask);
        Ok(self)
    }

    /// Initial displacement and velocity of the forward problem
    ///
    /// # Errors
    /// Wrong shape.
    pub fn with_initial_conditions(
        mut self,
        init_disp: Array2<f64>,
        init_vel: Array2<f64>,
    ) -> Result<Self> {
        check_node_field(&init_disp.view(), self.zero.dim())?;
        check_node_field(&init_vel.view(), self.zero.dim())?;
        self.init_disp = init_disp;
        self.init_vel = init_vel;
        Ok(self)
    }

    /// Projector between controls and force trajectories
    pub fn projector(&self) -> &FieldProjector {
        &self.projector
    }

    /// Forward and adjoint solver
    pub fn stepper(&self) -> &dyn TimeStepper {
        self.stepper.as_ref()
    }

    /// Regularization coefficient
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Observation mask, if any
    pub fn mask(&self) -> Option<&Array2<f64>> {
        self.mask.as_ref()
    }

    /// Initial displacement
    pub fn initial_displacement(&self) -> ArrayView2<f64> {
        self.init_disp.view()
    }

    /// Initial velocity
    pub fn initial_velocity(&self) -> ArrayView2<f64> {
        self.init_vel.view()
    }

    /// Length of the control vector
    pub fn num_params(&self) -> usize {
        self.projector.parameter_layout().len()
    }

    /// State for `control`, with the configured initial conditions
    ///
    /// # Errors
    /// Wrong control length or failing forward solve.
    pub fn forward(&self, control: &Array1<f64>) -> Result<FieldTrajectory> {
        let force = self.projector.expand(control)?;
        self.stepper.solve(
            &force,
            self.init_disp.view(),
            self.init_vel.view(),
            SolveMode::Forward,
        )
    }

    /// Linearized forward solve, zero initial conditions
    ///
    /// # Errors
    /// Failing forward solve.
    pub fn forward_homogeneous(&self, force: &FieldTrajectory) -> Result<FieldTrajectory> {
        self.stepper
            .solve(force, self.zero.view(), self.zero.view(), SolveMode::Forward)
    }

    /// Adjoint solve, zero terminal conditions
    ///
    /// # Errors
    /// Failing adjoint solve.
    pub fn adjoint(&self, rhs: &FieldTrajectory) -> Result<FieldTrajectory> {
        self.stepper
            .solve(rhs, self.zero.view(), self.zero.view(), SolveMode::Adjoint)
    }

    /// Multiply trajectory with the mask, no-op without mask
    ///
    /// # Errors
    /// Wrong shape.
    pub fn apply_mask(&self, traj: &mut FieldTrajectory) -> Result<()> {
        match &self.mask {
            Some(mask) => traj.apply_mask(mask),
            None => Ok(()),
        }
    }

    /// Misfit 1/2 <m r, r>_T of a residual trajectory
    pub fn misfit(&self, residual: &FieldTrajectory) -> f64 {
        let dt = self.projector.time_info().step;
        let sum = match &self.mask {
            Some(mask) => residual
                .v
                .outer_iter()
                .map(|snap| {
                    let mut s = 0.;
                    Zip::from(&snap).and(mask).for_each(|r, m| s += m * r * r);
                    s
                })
                .sum::<f64>(),
            None => residual.v.iter().map(|r| r * r).sum::<f64>(),
        };
        0.5 * dt * sum
    }

    /// Regularization term beta/2 |c|^2
    pub fn regularization(&self, control: &Array1<f64>) -> f64 {
        0.5 * self.beta * control.dot(control)
    }
}

/// Node field of shape (nodes, dof)
///
/// # Errors
/// Wrong shape.
pub(crate) fn check_node_field(field: &ArrayView2<f64>, shape: (usize, usize)) -> Result<()> {
    if field.dim() == shape {
        Ok(())
    } else {
        Err(InverseError::FieldShape {
            expected: vec![shape.0, shape.1],
            found: field.shape().to_vec(),
        })
    }
}

/// Observation mask of shape (nodes, dof) with non-negative entries
///
/// # Errors
/// Wrong shape or negative (or NaN) entries.
pub(crate) fn check_mask(mask: &ArrayView2<f64>, shape: (usize, usize)) -> Result<()> {
    check_node_field(mask, shape)?;
    if mask.iter().any(|m| !(*m >= 0.)) {
        return Err(InverseError::Config(
            "observation mask must be non-negative".to_owned(),
        ));
    }
    Ok(())
}
