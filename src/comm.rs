//! # Communicator
//! Collective operations between workers that each own a disjoint
//! part of the spatial domain.
//!
//! Implemented:
//! - [`SerialComm`]: single worker, reductions are the identity
//! - [`MpiComm`]: mpi world communicator (feature `mpi`)
//!
//! The projector performs exactly one collective sum per `reduce`,
//! which must be entered by every worker.
use crate::error::Result;

/// Collective reduction across workers
pub trait Communicator {
    /// Index of this worker
    fn rank(&self) -> usize;

    /// Number of workers
    fn size(&self) -> usize;

    /// Replace `buf` on every worker by the element-wise sum of all
    /// workers' buffers.
    ///
    /// # Errors
    /// The collective operation failed.
    fn all_reduce_sum(&self, buf: &mut [f64]) -> Result<()>;
}

/// Single worker communicator
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buf: &mut [f64]) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "mpi")]
pub use self::mpi_comm::MpiComm;

#[cfg(feature = "mpi")]
mod mpi_comm {
    use super::Communicator;
    use crate::error::{InverseError, Result};
    use mpi::collective::SystemOperation;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, CommunicatorCollectives};

    /// Communicator on the mpi world
    pub struct MpiComm {
        world: SimpleCommunicator,
    }

    impl MpiComm {
        /// Wrap world communicator of an initialized universe
        pub fn new(universe: &mpi::environment::Universe) -> Self {
            Self {
                world: universe.world(),
            }
        }
    }

    impl Communicator for MpiComm {
        #[allow(clippy::cast_sign_loss)]
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        #[allow(clippy::cast_sign_loss)]
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        #[allow(clippy::cast_possible_wrap)]
        fn all_reduce_sum(&self, buf: &mut [f64]) -> Result<()> {
            // All buffers must have the same length
            let len = buf.len() as i64;
            let mut bounds = [0i64; 2];
            self.world
                .all_reduce_into(&[len, -len][..], &mut bounds[..], SystemOperation::max());
            if bounds[0] != len || -bounds[1] != len {
                return Err(InverseError::Communication(format!(
                    "buffer length {} on rank {}, lengths range from {} to {}",
                    len,
                    self.world.rank(),
                    -bounds[1],
                    bounds[0]
                )));
            }
            if buf.is_empty() {
                return Ok(());
            }
            let send = buf.to_vec();
            self.world
                .all_reduce_into(&send[..], buf, SystemOperation::sum());
            Ok(())
        }
    }
}
