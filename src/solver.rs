//! # Linear solver
//!
//! Krylov methods for the symmetric positive definite systems of
//! the reduced space inverse problem. The operator is only accessed
//! through matrix-vector products, see [`LinearOperator`].
//!
//! Implemented:
//! - `ConjugateGradient`, see [`cg::ConjugateGradient`]
#![allow(clippy::module_name_repetitions)]
pub mod cg;
use crate::error::{InverseError, Result};
pub use cg::{CgConfig, CgResult, ConjugateGradient};
use ndarray::Array1;

/// Matrix free linear operator y = A x.
pub trait LinearOperator {
    /// Length of input and output vectors
    fn dim(&self) -> usize;

    /// Return A x
    ///
    /// # Errors
    /// Applying the operator failed, e.g. a forward or adjoint solve.
    fn apply(&self, x: &Array1<f64>) -> Result<Array1<f64>>;
}

/// Dense matrix as linear operator
impl LinearOperator for ndarray::Array2<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        if x.len() != self.ncols() {
            return Err(InverseError::ControlDimension {
                expected: self.ncols(),
                found: x.len(),
            });
        }
        Ok(self.dot(x))
    }
}
