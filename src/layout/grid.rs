//! Structured grid of nodes on the unit cube
use super::{LayoutKind, NodeLayout};
use crate::error::{InverseError, Result};
use crate::types::Point;

/// Structured grid with `dims = [nx, ny, nz]` nodes, spacing
/// `1 / (n - 1)` along each axis.
///
/// A worker owns the slab of z-planes `z_range.0 .. z_range.1`.
/// Local node `p` is ordered x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    dims: [usize; 3],
    z_range: (usize, usize),
}

impl GridLayout {
    /// Return grid owning all nodes
    ///
    /// # Errors
    /// Any dimension is zero.
    pub fn new(dims: [usize; 3]) -> Result<Self> {
        if dims.iter().any(|n| *n == 0) {
            return Err(InverseError::Config(format!(
                "grid dimensions must be positive, got {:?}",
                dims
            )));
        }
        Ok(Self {
            dims,
            z_range: (0, dims[2]),
        })
    }

    /// Slab of this grid owned by worker `rank` of `size`.
    /// Slabs are disjoint and cover all z-planes.
    ///
    /// # Errors
    /// `rank >= size` or more workers than z-planes.
    pub fn partition(&self, rank: usize, size: usize) -> Result<Self> {
        let nz = self.dims[2];
        if size == 0 || rank >= size || size > nz {
            return Err(InverseError::Config(format!(
                "cannot split {} planes for rank {} of {}",
                nz, rank, size
            )));
        }
        let base = nz / size;
        let rest = nz % size;
        let start = rank * base + rank.min(rest);
        let len = base + usize::from(rank < rest);
        Ok(Self {
            dims: self.dims,
            z_range: (start, start + len),
        })
    }

    /// Global number of nodes along each axis
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Owned z-planes
    pub fn z_range(&self) -> (usize, usize) {
        self.z_range
    }

    /// Node spacing along each axis
    #[allow(clippy::cast_precision_loss)]
    pub fn spacing(&self) -> [f64; 3] {
        let mut h = [0.; 3];
        for (hi, n) in h.iter_mut().zip(self.dims.iter()) {
            *hi = if *n > 1 { 1. / (*n - 1) as f64 } else { 1. };
        }
        h
    }

    /// Global (i, j, k) of local node `p`
    pub fn node_index(&self, p: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        let i = p % nx;
        let j = (p / nx) % ny;
        let k = p / (nx * ny) + self.z_range.0;
        [i, j, k]
    }

    /// Local node of global (i, j, k), None if not owned
    pub fn local_node(&self, idx: [usize; 3]) -> Option<usize> {
        let [nx, ny, _] = self.dims;
        let [i, j, k] = idx;
        if i >= nx || j >= ny || k < self.z_range.0 || k >= self.z_range.1 {
            return None;
        }
        Some((k - self.z_range.0) * nx * ny + j * nx + i)
    }
}

impl NodeLayout for GridLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Grid
    }

    fn num_nodes(&self) -> usize {
        self.dims[0] * self.dims[1] * (self.z_range.1 - self.z_range.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn node_point(&self, p: usize) -> Point {
        let idx = self.node_index(p);
        let mut x = [0.; 3];
        for d in 0..3 {
            if self.dims[d] > 1 {
                x[d] = idx[d] as f64 / (self.dims[d] - 1) as f64;
            }
        }
        x
    }

    fn neighbours(&self, p: usize) -> Vec<(usize, f64)> {
        let idx = self.node_index(p);
        let h = self.spacing();
        let mut nb = Vec::with_capacity(6);
        for d in 0..3 {
            if idx[d] > 0 {
                let mut other = idx;
                other[d] -= 1;
                if let Some(q) = self.local_node(other) {
                    nb.push((q, h[d]));
                }
            }
            let mut other = idx;
            other[d] += 1;
            if let Some(q) = self.local_node(other) {
                nb.push((q, h[d]));
            }
        }
        nb
    }
}
