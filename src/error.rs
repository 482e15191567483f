//! Error type of `elasinv`
use thiserror::Error;

/// Errors raised by the projector, the time stepper and the inverse solver
#[derive(Error, Debug)]
pub enum InverseError {
    /// Control vector length does not match the basis layout
    #[error("control vector has length {found}, expected {expected}")]
    ControlDimension {
        /// Length derived from the basis layout
        expected: usize,
        /// Length of the supplied vector
        found: usize,
    },

    /// Number of snapshots does not match the time info
    #[error("field trajectory holds {found} snapshots, expected {expected}")]
    TrajectoryLength {
        /// Snapshots dictated by time bounds and step size
        expected: usize,
        /// Snapshots of the supplied trajectory
        found: usize,
    },

    /// Node or degree of freedom count does not match
    #[error("field shape mismatch: expected {expected:?}, found {found:?}")]
    FieldShape {
        /// Expected shape
        expected: Vec<usize>,
        /// Supplied shape
        found: Vec<usize>,
    },

    /// A required input was not provided before use
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// Operation not allowed in the current driver state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid basis definition
    #[error("basis error: {0}")]
    Basis(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Forward or adjoint solve failed
    #[error("time stepper failed: {0}")]
    Solver(String),

    /// Collective reduction failed
    #[error("communication error: {0}")]
    Communication(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hdf5 error
    #[cfg(feature = "hdf5")]
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

/// Result alias used throughout this crate
pub type Result<T> = std::result::Result<T, InverseError>;

impl From<ndarray::ShapeError> for InverseError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::Config(format!("shape error: {}", e))
    }
}
