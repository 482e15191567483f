//! # Field trajectory
//! Sequence of full-domain snapshots, one value per local node
//! and degree of freedom.
//!
//! Stored as a three dimensional array with axes
//! (snapshot, node, dof).
use crate::error::{InverseError, Result};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayViewMut2, Axis, Zip};

/// Time series of node fields
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTrajectory {
    /// Snapshots, shape (num_snapshots, num_nodes, dof)
    pub v: Array3<f64>,
}

impl FieldTrajectory {
    /// Return zero trajectory
    pub fn zeros(num_snapshots: usize, num_nodes: usize, dof: usize) -> Self {
        Self {
            v: Array3::zeros((num_snapshots, num_nodes, dof)),
        }
    }

    /// Wrap snapshot array
    pub fn from_array(v: Array3<f64>) -> Self {
        Self { v }
    }

    /// Constant snapshot repeated `num_snapshots` times
    pub fn from_snapshot(snapshot: &Array2<f64>, num_snapshots: usize) -> Self {
        let (n, d) = snapshot.dim();
        let mut traj = Self::zeros(num_snapshots, n, d);
        for mut snap in traj.v.outer_iter_mut() {
            snap.assign(snapshot);
        }
        traj
    }

    /// Unwrap snapshot array
    pub fn into_inner(self) -> Array3<f64> {
        self.v
    }

    /// Number of snapshots
    pub fn num_snapshots(&self) -> usize {
        self.v.shape()[0]
    }

    /// Number of nodes per snapshot
    pub fn num_nodes(&self) -> usize {
        self.v.shape()[1]
    }

    /// Degrees of freedom per node
    pub fn dof(&self) -> usize {
        self.v.shape()[2]
    }

    /// View snapshot `t`
    ///
    /// # Panics
    /// `t` out of range.
    pub fn snapshot(&self, t: usize) -> ArrayView2<f64> {
        self.v.index_axis(Axis(0), t)
    }

    /// Mutable view of snapshot `t`
    ///
    /// # Panics
    /// `t` out of range.
    pub fn snapshot_mut(&mut self, t: usize) -> ArrayViewMut2<f64> {
        self.v.index_axis_mut(Axis(0), t)
    }

    /// Check number of snapshots and snapshot shape
    ///
    /// # Errors
    /// Number of snapshots or (node, dof) shape differ.
    pub fn check_shape(&self, num_snapshots: usize, num_nodes: usize, dof: usize) -> Result<()> {
        if self.num_snapshots() != num_snapshots {
            return Err(InverseError::TrajectoryLength {
                expected: num_snapshots,
                found: self.num_snapshots(),
            });
        }
        if self.num_nodes() != num_nodes || self.dof() != dof {
            return Err(InverseError::FieldShape {
                expected: vec![num_snapshots, num_nodes, dof],
                found: self.v.shape().to_vec(),
            });
        }
        Ok(())
    }

    fn check_same_shape(&self, other: &Self) -> Result<()> {
        if self.v.shape() == other.v.shape() {
            Ok(())
        } else {
            Err(InverseError::FieldShape {
                expected: self.v.shape().to_vec(),
                found: other.v.shape().to_vec(),
            })
        }
    }

    /// self += alpha * other
    ///
    /// # Errors
    /// Shapes differ.
    pub fn scaled_add(&mut self, alpha: f64, other: &Self) -> Result<()> {
        self.check_same_shape(other)?;
        self.v.scaled_add(alpha, &other.v);
        Ok(())
    }

    /// self *= alpha
    pub fn scale(&mut self, alpha: f64) {
        self.v.mapv_inplace(|x| alpha * x);
    }

    /// Multiply every snapshot element-wise with `mask`
    ///
    /// # Errors
    /// Mask shape differs from (num_nodes, dof).
    pub fn apply_mask(&mut self, mask: &Array2<f64>) -> Result<()> {
        if mask.dim() != (self.num_nodes(), self.dof()) {
            return Err(InverseError::FieldShape {
                expected: vec![self.num_nodes(), self.dof()],
                found: mask.shape().to_vec(),
            });
        }
        for mut snap in self.v.outer_iter_mut() {
            snap *= mask;
        }
        Ok(())
    }

    /// Plain euclidean inner product over all entries
    ///
    /// # Errors
    /// Shapes differ.
    pub fn dot(&self, other: &Self) -> Result<f64> {
        self.check_same_shape(other)?;
        let mut s = 0.;
        Zip::from(&self.v).and(&other.v).for_each(|a, b| s += a * b);
        Ok(s)
    }

    /// Time weighted inner product, sum_t dt sum_(p,d) f\[t,p,d\] g\[t,p,d\].
    ///
    /// `reduce` is the adjoint of `expand` with respect to this product.
    ///
    /// # Errors
    /// Shapes differ.
    pub fn weighted_dot(&self, other: &Self, dt: f64) -> Result<f64> {
        Ok(dt * self.dot(other)?)
    }

    /// L2 norm over all entries
    pub fn norm_l2(&self) -> f64 {
        crate::functions::norm_l2(self.v.iter())
    }

    /// Return trajectory with reversed order of snapshots
    pub fn reversed(&self) -> Self {
        let mut v = Array3::zeros(self.v.raw_dim());
        v.assign(&self.v.slice(s![..;-1, .., ..]));
        Self { v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn ramp(nt: usize, np: usize, nd: usize) -> FieldTrajectory {
        FieldTrajectory::from_array(
            Array::range(0., (nt * np * nd) as f64, 1.)
                .into_shape((nt, np, nd))
                .unwrap(),
        )
    }

    #[test]
    fn test_shape_checks() {
        let f = FieldTrajectory::zeros(3, 4, 2);
        assert!(f.check_shape(3, 4, 2).is_ok());
        assert!(matches!(
            f.check_shape(4, 4, 2),
            Err(InverseError::TrajectoryLength {
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            f.check_shape(3, 5, 2),
            Err(InverseError::FieldShape { .. })
        ));
        let g = FieldTrajectory::zeros(3, 4, 1);
        assert!(f.dot(&g).is_err());
    }

    #[test]
    fn test_scaled_add_and_dot() {
        let mut f = ramp(2, 2, 1);
        let g = FieldTrajectory::from_snapshot(&Array2::ones((2, 1)), 2);
        assert_eq!(f.dot(&g).unwrap(), 6.);
        assert_eq!(f.weighted_dot(&g, 0.5).unwrap(), 3.);
        f.scaled_add(-1., &g).unwrap();
        assert_eq!(f.v.as_slice().unwrap(), &[-1., 0., 1., 2.]);
        f.scale(2.);
        assert_eq!(f.v.as_slice().unwrap(), &[-2., 0., 2., 4.]);
    }

    #[test]
    fn test_mask() {
        let mut f = ramp(2, 2, 2);
        let mut mask = Array2::zeros((2, 2));
        mask[[1, 0]] = 1.;
        f.apply_mask(&mask).unwrap();
        assert_eq!(f.v.as_slice().unwrap(), &[0., 0., 2., 0., 0., 0., 6., 0.]);
        assert!(f.apply_mask(&Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn test_reversed() {
        let f = ramp(3, 1, 1);
        let r = f.reversed();
        assert_eq!(r.v.iter().copied().collect::<Vec<f64>>(), vec![2., 1., 0.]);
        assert_eq!(r.reversed(), f);
    }
}
