//! # Node layouts
//! Spatial discretizations the forward model can live on.
//!
//! Implemented:
//! - `GridLayout` (structured, slab partitioned), see [`grid::GridLayout`]
//! - `TreeLayout` (octree nodes), see [`tree::TreeLayout`]
//!
//! Both are accessed through the [`NodeLayout`] trait, such that the
//! projector and the reference time stepper are written once
//! for both discretizations.
pub mod grid;
pub mod tree;
use crate::types::Point;
pub use grid::GridLayout;
pub use tree::TreeLayout;

/// Discretization family of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Structured (i, j, k) grid
    Grid,
    /// Octree
    Tree,
}

/// Access to the nodes owned by the local worker
#[enum_dispatch]
pub trait NodeLayout {
    /// Discretization family
    fn kind(&self) -> LayoutKind;

    /// Number of locally owned nodes
    fn num_nodes(&self) -> usize;

    /// Coordinates of local node `p` in \[0,1\]^3
    fn node_point(&self, p: usize) -> Point;

    /// Local neighbours of node `p`, as (node, distance) pairs.
    /// The relation is symmetric.
    fn neighbours(&self, p: usize) -> Vec<(usize, f64)>;

    /// Layout can be traversed as (i, j, k) grid
    fn supports_grid_iteration(&self) -> bool {
        self.kind() == LayoutKind::Grid
    }

    /// Layout can be traversed as octree
    fn supports_tree_iteration(&self) -> bool {
        self.kind() == LayoutKind::Tree
    }

    /// Coordinates of all local nodes
    fn points(&self) -> Vec<Point> {
        (0..self.num_nodes()).map(|p| self.node_point(p)).collect()
    }
}

/// Collection of node layouts
#[enum_dispatch(NodeLayout)]
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    /// Structured grid
    Grid(GridLayout),
    /// Octree
    Tree(TreeLayout),
}
