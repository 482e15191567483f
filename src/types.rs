//! Types shared by the projector, the time stepper and the inverse solver
use crate::error::{InverseError, Result};
use serde::{Deserialize, Serialize};

/// Point in normalised domain coordinates \[0,1\]^3
pub type Point = [f64; 3];

/// Relative tolerance used when counting time steps, such that
/// `(1.0 - 0.0) / 0.1` yields 10 steps and not 11.
const STEP_COUNT_TOL: f64 = 1e-9;

/// Time bounds and step size of the forward problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInfo {
    /// Start time
    pub start: f64,
    /// Stop time
    pub stop: f64,
    /// Time step size
    pub step: f64,
}

impl TimeInfo {
    /// Return new time info
    ///
    /// # Errors
    /// Step size not positive or stop before start.
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        let ti = Self { start, stop, step };
        ti.validate()?;
        Ok(ti)
    }

    /// Check bounds and step size
    ///
    /// # Errors
    /// Step size not positive, non-finite values or stop before start.
    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(InverseError::Config(format!(
                "time info must be finite, got {:?}",
                self
            )));
        }
        if self.step <= 0. {
            return Err(InverseError::Config(format!(
                "time step must be positive, got {}",
                self.step
            )));
        }
        if self.stop < self.start {
            return Err(InverseError::Config(format!(
                "stop time {} before start time {}",
                self.stop, self.start
            )));
        }
        Ok(())
    }

    /// Number of time steps, ceil((stop - start) / step)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn num_steps(&self) -> usize {
        let ratio = (self.stop - self.start) / self.step;
        let n = (ratio - STEP_COUNT_TOL * ratio.abs().max(1.)).ceil();
        if n < 0. {
            0
        } else {
            n as usize
        }
    }

    /// Number of snapshots in a trajectory (`num_steps + 1`)
    pub fn num_snapshots(&self) -> usize {
        self.num_steps() + 1
    }

    /// Simulation time of snapshot `n`
    #[allow(clippy::cast_precision_loss)]
    pub fn time_at(&self, n: usize) -> f64 {
        self.start + n as f64 * self.step
    }
}

impl Default for TimeInfo {
    fn default() -> Self {
        Self {
            start: 0.,
            stop: 1.,
            step: 0.1,
        }
    }
}

/// Direction of a time stepper solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Integrate the state equations forward in time
    Forward,
    /// Integrate the adjoint equations backward in time
    Adjoint,
}

/// Layout of the reduced parameter (control) vector.
///
/// The control is ordered as
/// `index(b, k, d) = b * K * D + k * D + d`
/// with `b` the spatial basis, `k` the temporal knot and `d` the
/// degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterLayout {
    /// Number of spatial basis functions (B)
    pub basis_count: usize,
    /// Number of temporal knots (K)
    pub knot_count: usize,
    /// Degrees of freedom per node (D)
    pub dof: usize,
}

impl ParameterLayout {
    /// Return new layout
    pub fn new(basis_count: usize, knot_count: usize, dof: usize) -> Self {
        Self {
            basis_count,
            knot_count,
            dof,
        }
    }

    /// Total number of parameters B * K * D
    pub fn len(&self) -> usize {
        self.basis_count * self.knot_count * self.dof
    }

    /// True if the layout holds no parameters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of (basis, knot, dof)
    pub fn index(&self, b: usize, k: usize, d: usize) -> usize {
        b * self.knot_count * self.dof + k * self.dof + d
    }

    /// Shape (B, K, D) of the control viewed as 3d array
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.basis_count, self.knot_count, self.dof)
    }

    /// Check the length of a control vector
    ///
    /// # Errors
    /// Length differs from `B * K * D`.
    pub fn check(&self, len: usize) -> Result<()> {
        if len == self.len() {
            Ok(())
        } else {
            Err(InverseError::ControlDimension {
                expected: self.len(),
                found: len,
            })
        }
    }
}
