//! # Inversion driver
//!
//! Owns the iterate and walks through
//! `Uninitialized -> Initialized -> GradientComputed -> Solved -> Done`.
//!
//! All inputs are set in `Uninitialized`, `init()` builds projector and
//! context, `solve()` performs a single Newton step
//! $$
//! H s = g, \quad c \leftarrow c - s
//! $$
//! which is exact for the quadratic objective up to the tolerance of
//! the conjugate gradient method.
use super::context::{check_mask, check_node_field};
use super::{compute_gradient, InverseContext, ReducedHessian};
use crate::bases::{BSplineBasis, SpatialBasisSet};
use crate::comm::{Communicator, SerialComm};
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use crate::functions::norm_l2;
use crate::layout::NodeLayout;
use crate::projector::FieldProjector;
use crate::solver::{CgConfig, CgResult, ConjugateGradient};
use crate::types::ParameterLayout;
use crate::TimeStepper;
use ndarray::{Array1, Array2};

/// Default regularization coefficient
pub const DEFAULT_REGULARIZATION: f64 = 1e-6;

/// Lifecycle of [`InversionDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Accepts configuration
    Uninitialized,
    /// Projector and context are built
    Initialized,
    /// Gradient at the current control is known
    GradientComputed,
    /// Newton step applied
    Solved,
    /// Control was handed out
    Done,
}

/// Diagnostics of [`InversionDriver::solve`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Outcome of the linear solve
    pub cg: CgResult,
    /// Misfit at the initial control
    pub misfit: f64,
    /// Regularization at the initial control
    pub regularization: f64,
    /// Norm of the gradient at the initial control
    pub gradient_norm: f64,
    /// Norm of the Newton step
    pub step_norm: f64,
    /// Hessian-vector products used by the linear solve
    pub hessian_applications: usize,
}

/// Reduced space inversion driver
pub struct InversionDriver {
    state: DriverState,
    stepper: Option<Box<dyn TimeStepper>>,
    comm: Option<Box<dyn Communicator>>,
    spatial: Option<SpatialBasisSet>,
    temporal: Option<BSplineBasis>,
    beta: f64,
    observations: Option<FieldTrajectory>,
    initial_conditions: Option<(Array2<f64>, Array2<f64>)>,
    mask: Option<Array2<f64>>,
    initial_guess: Option<Array1<f64>>,
    cg_config: CgConfig,
    ctx: Option<InverseContext>,
    control: Array1<f64>,
    gradient: Array1<f64>,
    step: Array1<f64>,
}

impl InversionDriver {
    /// Return driver around a forward / adjoint solver
    pub fn new(stepper: Box<dyn TimeStepper>) -> Self {
        Self {
            state: DriverState::Uninitialized,
            stepper: Some(stepper),
            comm: None,
            spatial: None,
            temporal: None,
            beta: DEFAULT_REGULARIZATION,
            observations: None,
            initial_conditions: None,
            mask: None,
            initial_guess: None,
            cg_config: CgConfig::default(),
            ctx: None,
            control: Array1::zeros(0),
            gradient: Array1::zeros(0),
            step: Array1::zeros(0),
        }
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    fn ensure_configurable(&self, what: &str) -> Result<()> {
        if self.state == DriverState::Uninitialized {
            Ok(())
        } else {
            Err(InverseError::InvalidState(format!(
                "cannot set {} in state {:?}, configuration is only allowed before init()",
                what, self.state
            )))
        }
    }

    /// Set spatial and temporal basis
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_basis(&mut self, spatial: SpatialBasisSet, temporal: BSplineBasis) -> Result<()> {
        self.ensure_configurable("basis")?;
        self.spatial = Some(spatial);
        self.temporal = Some(temporal);
        Ok(())
    }

    /// Set regularization coefficient beta (default 1e-6)
    ///
    /// # Errors
    /// Driver is already initialized or beta is negative.
    pub fn set_regularization(&mut self, beta: f64) -> Result<()> {
        self.ensure_configurable("regularization")?;
        if !(beta >= 0. && beta.is_finite()) {
            return Err(InverseError::Config(format!(
                "regularization must be non-negative, got {}",
                beta
            )));
        }
        self.beta = beta;
        Ok(())
    }

    /// Set observed displacements, they are consumed by `solve()`
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_observations(&mut self, observations: FieldTrajectory) -> Result<()> {
        self.ensure_configurable("observations")?;
        self.observations = Some(observations);
        Ok(())
    }

    /// Set initial displacement and velocity (default zero)
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_initial_conditions(
        &mut self,
        init_disp: Array2<f64>,
        init_vel: Array2<f64>,
    ) -> Result<()> {
        self.ensure_configurable("initial conditions")?;
        self.initial_conditions = Some((init_disp, init_vel));
        Ok(())
    }

    /// Restrict the misfit to nodes where the mask is non-zero
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_observation_mask(&mut self, mask: Array2<f64>) -> Result<()> {
        self.ensure_configurable("observation mask")?;
        self.mask = Some(mask);
        Ok(())
    }

    /// Set starting control (default zero)
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_initial_guess(&mut self, guess: Array1<f64>) -> Result<()> {
        self.ensure_configurable("initial guess")?;
        self.initial_guess = Some(guess);
        Ok(())
    }

    /// Set communicator for the collective sum (default [`SerialComm`])
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_communicator(&mut self, comm: Box<dyn Communicator>) -> Result<()> {
        self.ensure_configurable("communicator")?;
        self.comm = Some(comm);
        Ok(())
    }

    /// Set stopping criteria of the linear solve
    ///
    /// # Errors
    /// Driver is already initialized.
    pub fn set_solver_config(&mut self, config: CgConfig) -> Result<()> {
        self.ensure_configurable("solver config")?;
        self.cg_config = config;
        Ok(())
    }

    /// Validate configuration, build projector and context and
    /// allocate control, gradient and step.
    ///
    /// All input is checked before anything is moved into the context,
    /// a failed `init()` leaves the driver in `Uninitialized` with its
    /// configuration intact.
    ///
    /// # Errors
    /// Already initialized, no basis set, or inconsistent input.
    pub fn init(&mut self) -> Result<()> {
        if self.state != DriverState::Uninitialized {
            return Err(InverseError::InvalidState(format!(
                "init() called in state {:?}",
                self.state
            )));
        }
        self.validate()?;
        let (spatial, temporal, stepper) =
            match (self.spatial.take(), self.temporal.take(), self.stepper.take()) {
                (Some(s), Some(t), Some(st)) => (s, t, st),
                _ => return Err(InverseError::NotConfigured("basis")),
            };
        let comm = self
            .comm
            .take()
            .unwrap_or_else(|| Box::new(SerialComm) as Box<dyn Communicator>);
        let rank = comm.rank();

        let projector = FieldProjector::new(
            spatial,
            temporal,
            stepper.layout(),
            stepper.time_info(),
            stepper.dof(),
            comm,
        )?;
        let mut ctx = InverseContext::new(projector, stepper, self.beta)?;
        if let Some(mask) = self.mask.take() {
            ctx = ctx.with_mask(mask)?;
        }
        if let Some((u0, v0)) = self.initial_conditions.take() {
            ctx = ctx.with_initial_conditions(u0, v0)?;
        }

        let params = ctx.projector().parameter_layout();
        self.control = self
            .initial_guess
            .take()
            .unwrap_or_else(|| Array1::zeros(params.len()));
        self.gradient = Array1::zeros(params.len());
        self.step = Array1::zeros(params.len());
        if rank == 0 {
            log::info!(
                "inversion initialized: {} spatial x {} temporal x {} dof = {} parameters, {} local nodes, {} time steps, beta = {:e}",
                params.basis_count,
                params.knot_count,
                params.dof,
                params.len(),
                ctx.stepper().layout().num_nodes(),
                ctx.stepper().time_info().num_steps(),
                ctx.beta()
            );
        }
        self.ctx = Some(ctx);
        self.state = DriverState::Initialized;
        Ok(())
    }

    /// Checks everything `init()` needs without consuming the input
    fn validate(&self) -> Result<()> {
        let (spatial, temporal) = match (&self.spatial, &self.temporal) {
            (Some(s), Some(t)) => (s, t),
            _ => return Err(InverseError::NotConfigured("basis")),
        };
        let stepper = self
            .stepper
            .as_ref()
            .ok_or(InverseError::NotConfigured("time stepper"))?;
        let time = stepper.time_info();
        let dof = stepper.dof();
        FieldProjector::check_input(spatial, time, dof)?;
        if !(self.beta >= 0. && self.beta.is_finite()) {
            return Err(InverseError::Config(format!(
                "regularization must be non-negative, got {}",
                self.beta
            )));
        }
        let shape = (stepper.layout().num_nodes(), dof);
        if let Some(mask) = &self.mask {
            check_mask(&mask.view(), shape)?;
        }
        if let Some((u0, v0)) = &self.initial_conditions {
            check_node_field(&u0.view(), shape)?;
            check_node_field(&v0.view(), shape)?;
        }
        if let Some(guess) = &self.initial_guess {
            ParameterLayout::new(spatial.len(), temporal.num_knots(), dof).check(guess.len())?;
        }
        Ok(())
    }

    /// Context built by `init()`
    pub fn context(&self) -> Option<&InverseContext> {
        self.ctx.as_ref()
    }

    /// Gradient at the initial control, available after `solve()`
    pub fn gradient(&self) -> Option<&Array1<f64>> {
        match self.state {
            DriverState::GradientComputed | DriverState::Solved => Some(&self.gradient),
            _ => None,
        }
    }

    /// Single Newton step: gradient, CG solve of `H s = g`, `c -= s`.
    ///
    /// The observations are consumed. Missing convergence of the linear
    /// solve is logged and reported, but no error.
    ///
    /// # Errors
    /// Not initialized, already finished, observations missing (a second
    /// call fails this way) or a failing solve.
    pub fn solve(&mut self) -> Result<SolveReport> {
        if matches!(self.state, DriverState::Uninitialized | DriverState::Done) {
            return Err(InverseError::InvalidState(format!(
                "solve() called in state {:?}",
                self.state
            )));
        }
        let observations = self
            .observations
            .take()
            .ok_or(InverseError::NotConfigured("observations"))?;
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| InverseError::InvalidState("context missing".to_owned()))?;
        let rank = ctx.projector().communicator().rank();

        self.step.fill(0.);
        let grad = compute_gradient(ctx, &self.control, observations)?;
        self.gradient = grad.gradient;
        self.state = DriverState::GradientComputed;
        let gradient_norm = norm_l2(self.gradient.iter());
        if rank == 0 {
            log::info!(
                "objective = {:.6e} (misfit {:.6e}, regularization {:.6e}), |g| = {:.6e}",
                grad.misfit + grad.regularization,
                grad.misfit,
                grad.regularization,
                gradient_norm
            );
        }

        let hessian = ReducedHessian::new(ctx);
        let cg = ConjugateGradient::new(self.cg_config);
        let res = cg.solve(&hessian, &self.gradient, &mut self.step)?;
        if !res.converged {
            log::warn!(
                "newton step inexact: cg stopped after {} iterations with |r| = {:.6e}",
                res.iterations,
                res.residual_norm
            );
        }
        self.control -= &self.step;
        self.state = DriverState::Solved;

        let report = SolveReport {
            cg: res,
            misfit: grad.misfit,
            regularization: grad.regularization,
            gradient_norm,
            step_norm: norm_l2(self.step.iter()),
            hessian_applications: hessian.applications(),
        };
        if rank == 0 {
            log::info!(
                "cg: {} iterations, |r| = {:.6e}, |step| = {:.6e}",
                res.iterations,
                res.residual_norm,
                report.step_norm
            );
        }
        Ok(report)
    }

    /// Current control
    ///
    /// # Errors
    /// Not initialized or already finished.
    pub fn current_control(&self) -> Result<&Array1<f64>> {
        match self.state {
            DriverState::Uninitialized | DriverState::Done => Err(InverseError::InvalidState(
                format!("no control in state {:?}", self.state),
            )),
            _ => Ok(&self.control),
        }
    }

    /// Hand out the control and release all resources
    ///
    /// # Errors
    /// Not initialized or already finished.
    pub fn finish(&mut self) -> Result<Array1<f64>> {
        if matches!(self.state, DriverState::Uninitialized | DriverState::Done) {
            return Err(InverseError::InvalidState(format!(
                "finish() called in state {:?}",
                self.state
            )));
        }
        self.ctx = None;
        self.gradient = Array1::zeros(0);
        self.step = Array1::zeros(0);
        self.state = DriverState::Done;
        Ok(std::mem::replace(&mut self.control, Array1::zeros(0)))
    }
}
