//! # Field projector
//! Maps between the reduced control vector and full space-time
//! force trajectories.
//!
//! `expand` evaluates
//! $$
//! f\[n,p,d\] = \sum_b \sigma_b(p) \sum_k \tau_k(t_n) c\[b,k,d\]
//! $$
//! and `reduce` is its exact adjoint with respect to the time weighted
//! inner product
//! $$
//! \langle f, g \rangle_T = \Delta t \sum_n \sum_{p,d} f\[n,p,d\] g\[n,p,d\]
//! $$
//! on trajectories and the euclidean product on controls.
//!
//! Basis weights on the local nodes and at the snapshot times are
//! evaluated once at construction.
use crate::bases::{BSplineBasis, SpatialBasisSet};
use crate::comm::Communicator;
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use crate::layout::{Layout, NodeLayout};
use crate::types::{ParameterLayout, TimeInfo};
use ndarray::linalg::general_mat_mul;
use ndarray::{Array1, Array2, Array3, Axis, Zip};

/// Expansion and reduction between controls and trajectories
pub struct FieldProjector {
    spatial: SpatialBasisSet,
    temporal: BSplineBasis,
    time: TimeInfo,
    params: ParameterLayout,
    num_nodes: usize,
    /// sigma\[b, p\]
    sigma: Array2<f64>,
    /// tau\[n, k\]
    tau: Array2<f64>,
    comm: Box<dyn Communicator>,
}

impl FieldProjector {
    /// Return projector for the nodes owned by this worker
    ///
    /// # Errors
    /// Invalid time info, zero degrees of freedom or an empty spatial
    /// basis set.
    pub fn new(
        spatial: SpatialBasisSet,
        temporal: BSplineBasis,
        layout: &Layout,
        time: TimeInfo,
        dof: usize,
        comm: Box<dyn Communicator>,
    ) -> Result<Self> {
        Self::check_input(&spatial, time, dof)?;
        let points = layout.points();
        let num_nodes = points.len();
        let sigma = Array2::from_shape_fn((spatial.len(), num_nodes), |(b, p)| {
            spatial.evaluate(b, &points[p])
        });

        let nt = time.num_snapshots();
        let nk = temporal.num_knots();
        let mut tau = vec![0.; nt * nk];
        for (n, row) in tau.chunks_mut(nk).enumerate() {
            temporal.basis_into(time.time_at(n), row);
        }
        let tau = Array2::from_shape_vec((nt, nk), tau)?;

        let params = ParameterLayout::new(spatial.len(), nk, dof);
        Ok(Self {
            spatial,
            temporal,
            time,
            params,
            num_nodes,
            sigma,
            tau,
            comm,
        })
    }

    /// Checks of [`FieldProjector::new`] which do not need the layout
    ///
    /// # Errors
    /// Invalid time info, zero degrees of freedom or an empty spatial
    /// basis set.
    pub fn check_input(spatial: &SpatialBasisSet, time: TimeInfo, dof: usize) -> Result<()> {
        time.validate()?;
        if dof == 0 {
            return Err(InverseError::Config(
                "degrees of freedom must be positive".to_owned(),
            ));
        }
        if spatial.is_empty() {
            return Err(InverseError::Basis("spatial basis set is empty".to_owned()));
        }
        Ok(())
    }

    /// Layout of the control vector
    pub fn parameter_layout(&self) -> ParameterLayout {
        self.params
    }

    /// Time bounds and step size
    pub fn time_info(&self) -> TimeInfo {
        self.time
    }

    /// Number of locally owned nodes
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Degrees of freedom per node
    pub fn dof(&self) -> usize {
        self.params.dof
    }

    /// Spatial basis set
    pub fn spatial(&self) -> &SpatialBasisSet {
        &self.spatial
    }

    /// Temporal basis
    pub fn temporal(&self) -> &BSplineBasis {
        &self.temporal
    }

    /// Communicator used by `reduce`
    pub fn communicator(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    /// Spatial weights sigma\[b, p\] on the local nodes
    pub fn spatial_weights(&self) -> &Array2<f64> {
        &self.sigma
    }

    /// Temporal weights tau\[n, k\] at the snapshot times
    pub fn temporal_weights(&self) -> &Array2<f64> {
        &self.tau
    }

    /// Expand control into a force trajectory on the local nodes.
    ///
    /// Snapshots are computed in parallel.
    ///
    /// # Errors
    /// Control length differs from `B * K * D`.
    ///
    /// # Example
    ///```
    /// use elasinv::bases::{BSplineBasis, Kernel, SpatialBasisSet};
    /// use elasinv::comm::SerialComm;
    /// use elasinv::layout::{GridLayout, Layout};
    /// use elasinv::projector::FieldProjector;
    /// use elasinv::types::TimeInfo;
    /// use ndarray::Array1;
    ///
    /// let layout: Layout = GridLayout::new([3, 3, 3]).unwrap().into();
    /// let projector = FieldProjector::new(
    ///     SpatialBasisSet::lattice(1, Kernel::Gaussian),
    ///     BSplineBasis::new(1, 2).unwrap(),
    ///     &layout,
    ///     TimeInfo::new(0., 1., 0.25).unwrap(),
    ///     1,
    ///     Box::new(SerialComm),
    /// )
    /// .unwrap();
    /// let force = projector.expand(&Array1::ones(2)).unwrap();
    /// assert_eq!(force.v.shape(), &[5, 27, 1]);
    ///```
    pub fn expand(&self, control: &Array1<f64>) -> Result<FieldTrajectory> {
        self.params.check(control.len())?;
        let (nb, _, nd) = self.params.shape();
        let c = Array3::from_shape_vec(self.params.shape(), control.to_vec())?;
        let mut out = Array3::zeros((self.tau.nrows(), self.num_nodes, nd));
        let sigma = &self.sigma;
        Zip::from(out.outer_iter_mut())
            .and(self.tau.outer_iter())
            .par_for_each(|mut snap, tau_n| {
                // coef[b, d] = sum_k tau_n[k] c[b, k, d]
                let mut coef = Array2::zeros((nb, nd));
                for (k, w) in tau_n.iter().enumerate() {
                    if *w != 0. {
                        coef.scaled_add(*w, &c.index_axis(Axis(1), k));
                    }
                }
                general_mat_mul(1., &sigma.t(), &coef, 0., &mut snap);
            });
        Ok(FieldTrajectory::from_array(out))
    }

    /// Local contribution to `reduce`, without the collective sum.
    ///
    /// Summing the partial reductions of all workers gives `reduce`.
    ///
    /// # Errors
    /// Snapshot count or (node, dof) shape do not match.
    pub fn reduce_partial(&self, field: &FieldTrajectory) -> Result<Array1<f64>> {
        Ok(Array1::from(self.reduce_local(field)?))
    }

    /// Reduce a trajectory to the control space, summed over all workers.
    /// Every worker must call this, the result is identical on all of them.
    ///
    /// # Errors
    /// Snapshot count or (node, dof) shape do not match, or the
    /// collective sum failed.
    pub fn reduce(&self, field: &FieldTrajectory) -> Result<Array1<f64>> {
        let mut buf = self.reduce_local(field)?;
        self.comm.all_reduce_sum(&mut buf)?;
        Ok(Array1::from(buf))
    }

    fn reduce_local(&self, field: &FieldTrajectory) -> Result<Vec<f64>> {
        let (nb, nk, nd) = self.params.shape();
        field.check_shape(self.tau.nrows(), self.num_nodes, nd)?;
        let dt = self.time.step;

        // time integration per knot, I[k] = sum_n tau[n, k] dt f[n]
        let mut integral = Array3::<f64>::zeros((nk, self.num_nodes, nd));
        Zip::from(integral.outer_iter_mut())
            .and(self.tau.axis_iter(Axis(1)))
            .par_for_each(|mut ik, tau_k| {
                for (n, w) in tau_k.iter().enumerate() {
                    if *w != 0. {
                        ik.scaled_add(*w * dt, &field.v.index_axis(Axis(0), n));
                    }
                }
            });

        // spatial reduction, partial[b, k, :] = sigma I[k]
        let mut partial = Array3::<f64>::zeros((nb, nk, nd));
        let sigma = &self.sigma;
        Zip::from(partial.axis_iter_mut(Axis(1)))
            .and(integral.outer_iter())
            .par_for_each(|mut pk, ik| {
                general_mat_mul(1., sigma, &ik, 0., &mut pk);
            });
        Ok(partial.into_raw_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::{Kernel, RadialBasis};
    use crate::comm::SerialComm;
    use crate::functions::{random_trajectory, random_vector};
    use crate::layout::{GridLayout, TreeLayout};
    use ndarray::{s, Array1};

    fn approx_eq(result: f64, expected: f64, tol: f64) {
        let scale = expected.abs().max(1.);
        if (result - expected).abs() > tol * scale {
            panic!(
                "Large difference of values, got {} expected {}.",
                result, expected
            )
        }
    }

    fn projector(
        layout: &Layout,
        spatial: SpatialBasisSet,
        temporal: BSplineBasis,
        time: TimeInfo,
        dof: usize,
    ) -> FieldProjector {
        FieldProjector::new(spatial, temporal, layout, time, dof, Box::new(SerialComm)).unwrap()
    }

    fn check_adjoint(proj: &FieldProjector) {
        let params = proj.parameter_layout();
        let time = proj.time_info();
        let x = random_vector(params.len(), 1.);
        let f = random_trajectory(time.num_snapshots(), proj.num_nodes(), proj.dof(), 1.);
        let lhs = proj.reduce(&f).unwrap().dot(&x);
        let rhs = f.weighted_dot(&proj.expand(&x).unwrap(), time.step).unwrap();
        approx_eq(lhs, rhs, 1e-10);
    }

    #[test]
    fn test_single_basis_values() {
        let layout: Layout = GridLayout::new([2, 2, 2]).unwrap().into();
        let spatial = SpatialBasisSet::new(vec![RadialBasis::new([0.5; 3], [0.5; 3]).unwrap()])
            .unwrap();
        let temporal = BSplineBasis::new(3, 1).unwrap();
        let time = TimeInfo::new(0., 1., 0.5).unwrap();
        let proj = projector(&layout, spatial, temporal, time, 1);
        assert_eq!(proj.parameter_layout().len(), 1);

        let w = (-1.5f64).exp();
        let force = proj.expand(&Array1::from(vec![2.])).unwrap();
        assert_eq!(force.v.shape(), &[3, 8, 1]);
        for v in force.v.iter() {
            approx_eq(*v, 2. * w, 1e-14);
        }

        let ones = FieldTrajectory::from_array(Array3::ones((3, 8, 1)));
        let red = proj.reduce(&ones).unwrap();
        approx_eq(red[0], 3. * 0.5 * 8. * w, 1e-14);
    }

    #[test]
    fn test_adjoint_grid() {
        let layout: Layout = GridLayout::new([3, 4, 3]).unwrap().into();
        let time = TimeInfo::new(0., 1., 0.1).unwrap();
        for (degree, knots) in [(3, 5), (1, 3), (0, 2), (2, 7)].iter() {
            let temporal = BSplineBasis::on_interval(*degree, *knots, 0., 1.).unwrap();
            for dof in [1, 3].iter() {
                let proj = projector(
                    &layout,
                    SpatialBasisSet::lattice(2, Kernel::Gaussian),
                    temporal.clone(),
                    time,
                    *dof,
                );
                check_adjoint(&proj);
            }
        }
    }

    #[test]
    fn test_adjoint_tree() {
        let layout: Layout = TreeLayout::uniform(2, 4).unwrap().into();
        let time = TimeInfo::new(0., 0.7, 0.05).unwrap();
        let temporal = BSplineBasis::on_interval(2, 4, 0., 0.7).unwrap();
        for dof in [1, 3].iter() {
            let proj = projector(
                &layout,
                SpatialBasisSet::lattice(2, Kernel::Wendland),
                temporal.clone(),
                time,
                *dof,
            );
            check_adjoint(&proj);
        }
    }

    #[test]
    fn test_expand_linear() {
        let layout: Layout = GridLayout::new([3, 3, 3]).unwrap().into();
        let proj = projector(
            &layout,
            SpatialBasisSet::lattice(2, Kernel::Gaussian),
            BSplineBasis::new(3, 5).unwrap(),
            TimeInfo::default(),
            3,
        );
        let n = proj.parameter_layout().len();
        let x = random_vector(n, 1.);
        let y = random_vector(n, 1.);
        let a = 0.7;
        let lhs = proj.expand(&(&x * a + &y)).unwrap();
        let mut rhs = proj.expand(&y).unwrap();
        rhs.scaled_add(a, &proj.expand(&x).unwrap()).unwrap();
        for (l, r) in lhs.v.iter().zip(rhs.v.iter()) {
            approx_eq(*l, *r, 1e-12);
        }
        assert_eq!(proj.expand(&Array1::zeros(n)).unwrap().norm_l2(), 0.);
    }

    #[test]
    fn test_dimension_errors() {
        let layout: Layout = GridLayout::new([2, 2, 2]).unwrap().into();
        let proj = projector(
            &layout,
            SpatialBasisSet::lattice(1, Kernel::Gaussian),
            BSplineBasis::new(1, 3).unwrap(),
            TimeInfo::default(),
            2,
        );
        assert!(matches!(
            proj.expand(&Array1::zeros(5)),
            Err(InverseError::ControlDimension {
                expected: 6,
                found: 5
            })
        ));
        assert!(matches!(
            proj.reduce(&FieldTrajectory::zeros(10, 8, 2)),
            Err(InverseError::TrajectoryLength {
                expected: 11,
                found: 10
            })
        ));
        assert!(matches!(
            proj.reduce(&FieldTrajectory::zeros(11, 7, 2)),
            Err(InverseError::FieldShape { .. })
        ));
        assert!(matches!(
            proj.reduce(&FieldTrajectory::zeros(11, 8, 3)),
            Err(InverseError::FieldShape { .. })
        ));
        assert!(FieldProjector::new(
            SpatialBasisSet::default(),
            BSplineBasis::new(1, 3).unwrap(),
            &layout,
            TimeInfo::default(),
            2,
            Box::new(SerialComm)
        )
        .is_err());
    }

    #[test]
    fn test_partitioned_reduce() {
        let grid = GridLayout::new([3, 3, 5]).unwrap();
        let time = TimeInfo::default();
        let spatial = SpatialBasisSet::lattice(2, Kernel::Gaussian);
        let temporal = BSplineBasis::new(3, 5).unwrap();
        let full = projector(
            &grid.clone().into(),
            spatial.clone(),
            temporal.clone(),
            time,
            3,
        );
        let f = random_trajectory(time.num_snapshots(), grid.num_nodes(), 3, 1.);
        let expected = full.reduce(&f).unwrap();

        let size = 2;
        let mut sum = Array1::<f64>::zeros(expected.len());
        for rank in 0..size {
            let part = grid.partition(rank, size).unwrap();
            let (z0, z1) = part.z_range();
            let plane = 3 * 3;
            let local = FieldTrajectory::from_array(
                f.v.slice(s![.., z0 * plane..z1 * plane, ..]).to_owned(),
            );
            let proj = projector(&part.into(), spatial.clone(), temporal.clone(), time, 3);
            sum += &proj.reduce_partial(&local).unwrap();
        }
        for (a, b) in sum.iter().zip(expected.iter()) {
            approx_eq(*a, *b, 1e-12);
        }
    }
}
