//! Octree node set
use super::{LayoutKind, NodeLayout};
use crate::error::{InverseError, Result};
use crate::types::Point;
use std::collections::HashMap;

/// Nodes sharing the anchor coordinates of the two other axes,
/// as (coordinate, node) pairs sorted along the axis.
type Lines = HashMap<[u32; 2], Vec<(u32, usize)>>;

fn line_key(a: &[u32; 3], axis: usize) -> [u32; 2] {
    match axis {
        0 => [a[1], a[2]],
        1 => [a[0], a[2]],
        _ => [a[0], a[1]],
    }
}

fn build_lines(anchors: &[[u32; 3]]) -> [Lines; 3] {
    let mut lines: [Lines; 3] = Default::default();
    for (p, a) in anchors.iter().enumerate() {
        for (axis, line) in lines.iter_mut().enumerate() {
            line.entry(line_key(a, axis))
                .or_insert_with(Vec::new)
                .push((a[axis], p));
        }
    }
    for line in lines.iter_mut() {
        for nodes in line.values_mut() {
            nodes.sort_unstable();
        }
    }
    lines
}

/// Nodes of a (possibly adaptive) octree.
///
/// Every node is given by its integer anchor on the finest level and
/// the level of its octant. Coordinates are `anchor / 2^(max_depth - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLayout {
    anchors: Vec<[u32; 3]>,
    levels: Vec<u8>,
    max_depth: u8,
    coarsest: u8,
    lines: [Lines; 3],
}

impl TreeLayout {
    /// Return tree layout from anchors and octant levels
    ///
    /// # Errors
    /// Mismatching lengths, depth out of range (1..=31), levels deeper
    /// than `max_depth - 1` or anchors outside of the domain.
    pub fn new(anchors: Vec<[u32; 3]>, levels: Vec<u8>, max_depth: u8) -> Result<Self> {
        if anchors.len() != levels.len() {
            return Err(InverseError::Config(format!(
                "{} anchors but {} levels",
                anchors.len(),
                levels.len()
            )));
        }
        if max_depth == 0 || max_depth > 31 {
            return Err(InverseError::Config(format!(
                "max depth must be in 1..=31, got {}",
                max_depth
            )));
        }
        let extent = 1u32 << (max_depth - 1);
        if let Some(l) = levels.iter().find(|l| **l >= max_depth) {
            return Err(InverseError::Config(format!(
                "octant level {} exceeds max depth {}",
                l, max_depth
            )));
        }
        if let Some(a) = anchors.iter().find(|a| a.iter().any(|x| *x > extent)) {
            return Err(InverseError::Config(format!(
                "anchor {:?} outside of domain (extent {})",
                a, extent
            )));
        }
        let coarsest = levels.iter().copied().min().unwrap_or(0);
        let lines = build_lines(&anchors);
        Ok(Self {
            anchors,
            levels,
            max_depth,
            coarsest,
            lines,
        })
    }

    /// Uniformly refined octree: all octants on `level`, which gives
    /// (2^level + 1)^3 nodes.
    ///
    /// # Errors
    /// `level >= max_depth`.
    pub fn uniform(level: u8, max_depth: u8) -> Result<Self> {
        if max_depth == 0 || max_depth > 31 || level >= max_depth {
            return Err(InverseError::Config(format!(
                "level {} invalid for max depth {}",
                level, max_depth
            )));
        }
        let n = (1u32 << level) + 1;
        let stride = 1u32 << (max_depth - 1 - level);
        let count = (n as usize)
            .checked_pow(3)
            .ok_or_else(|| InverseError::Config(format!("level {} too large", level)))?;
        let mut anchors = Vec::with_capacity(count);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    anchors.push([i * stride, j * stride, k * stride]);
                }
            }
        }
        let levels = vec![level; anchors.len()];
        Self::new(anchors, levels, max_depth)
    }

    /// Maximum depth of the tree
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Level of the octant of node `p`
    pub fn level(&self, p: usize) -> u8 {
        self.levels[p]
    }

    /// Edge length of the octant of node `p`, in normalised coordinates
    pub fn node_size(&self, p: usize) -> f64 {
        0.5f64.powi(i32::from(self.levels[p]))
    }

    /// Edge length of the octant of node `p`, in anchor units
    fn anchor_size(&self, p: usize) -> u32 {
        1 << (self.max_depth - 1 - self.levels[p])
    }
}

impl NodeLayout for TreeLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Tree
    }

    fn num_nodes(&self) -> usize {
        self.anchors.len()
    }

    fn node_point(&self, p: usize) -> Point {
        let scale = f64::from(1u32 << (self.max_depth - 1));
        let a = self.anchors[p];
        [
            f64::from(a[0]) / scale,
            f64::from(a[1]) / scale,
            f64::from(a[2]) / scale,
        ]
    }

    /// Nodes that differ along exactly one axis, by at most the larger
    /// of both octant sizes.
    fn neighbours(&self, p: usize) -> Vec<(usize, f64)> {
        let a = self.anchors[p];
        let sp = self.anchor_size(p);
        let s_max = sp.max(1 << (self.max_depth - 1 - self.coarsest));
        let scale = f64::from(1u32 << (self.max_depth - 1));
        let mut nb = Vec::new();
        for (axis, lines) in self.lines.iter().enumerate() {
            let line = match lines.get(&line_key(&a, axis)) {
                Some(line) => line,
                None => continue,
            };
            let pos = line.partition_point(|(x, _)| *x < a[axis]);
            for (x, q) in line[..pos]
                .iter()
                .rev()
                .take_while(|(x, _)| a[axis] - x <= s_max)
                .chain(
                    line[pos..]
                        .iter()
                        .take_while(|(x, _)| x - a[axis] <= s_max),
                )
            {
                let dist = if *x > a[axis] { x - a[axis] } else { a[axis] - x };
                if dist > 0 && dist <= sp.max(self.anchor_size(*q)) {
                    nb.push((*q, f64::from(dist) / scale));
                }
            }
        }
        nb.sort_unstable_by_key(|(q, _)| *q);
        nb
    }
}
