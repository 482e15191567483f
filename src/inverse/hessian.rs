//! Matrix free reduced Hessian
use super::InverseContext;
use crate::error::Result;
use crate::solver::LinearOperator;
use ndarray::Array1;
use std::cell::Cell;

/// Gauss-Newton Hessian `H = dt E^T S^T m S E + beta I`.
///
/// Every application costs one forward and one adjoint solve, both
/// with zero initial conditions. The operator is symmetric and, for
/// `beta > 0`, positive definite.
pub struct ReducedHessian<'a> {
    ctx: &'a InverseContext,
    applications: Cell<usize>,
}

impl<'a> ReducedHessian<'a> {
    /// Return Hessian of the objective configured in `ctx`
    pub fn new(ctx: &'a InverseContext) -> Self {
        Self {
            ctx,
            applications: Cell::new(0),
        }
    }

    /// Number of Hessian-vector products evaluated so far
    pub fn applications(&self) -> usize {
        self.applications.get()
    }
}

impl LinearOperator for ReducedHessian<'_> {
    fn dim(&self) -> usize {
        self.ctx.num_params()
    }

    fn apply(&self, v: &Array1<f64>) -> Result<Array1<f64>> {
        let ctx = self.ctx;
        let force = ctx.projector().expand(v)?;
        let mut state = ctx.forward_homogeneous(&force)?;
        drop(force);
        state.scale(-1.);
        ctx.apply_mask(&mut state)?;
        let adjoint = ctx.adjoint(&state)?;
        drop(state);
        let mut hv = ctx.projector().reduce(&adjoint)?;
        hv.mapv_inplace(|x| -x);
        hv.scaled_add(ctx.beta(), v);
        self.applications.set(self.applications.get() + 1);
        Ok(hv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::{BSplineBasis, Kernel, SpatialBasisSet};
    use crate::comm::SerialComm;
    use crate::error::InverseError;
    use crate::functions::{random_trajectory, random_vector, relative_error};
    use crate::inverse::compute_gradient;
    use crate::layout::{GridLayout, Layout};
    use crate::newmark::{Material, Newmark};
    use crate::projector::FieldProjector;
    use crate::types::TimeInfo;
    use ndarray::Array2;

    fn context(beta: f64) -> InverseContext {
        let layout: Layout = GridLayout::new([3, 3, 3]).unwrap().into();
        let time = TimeInfo::new(0., 1., 0.1).unwrap();
        let projector = FieldProjector::new(
            SpatialBasisSet::lattice(2, Kernel::Gaussian),
            BSplineBasis::new(3, 5).unwrap(),
            &layout,
            time,
            1,
            Box::new(SerialComm),
        )
        .unwrap();
        let stepper = Newmark::new(layout, time, 1, Material::default()).unwrap();
        InverseContext::new(projector, Box::new(stepper), beta).unwrap()
    }

    #[test]
    fn test_hessian_symmetric_positive() {
        let ctx = context(1e-4);
        let hess = ReducedHessian::new(&ctx);
        let n = hess.dim();
        assert_eq!(n, 40);
        for _ in 0..3 {
            let x = random_vector(n, 1.);
            let y = random_vector(n, 1.);
            let xhy = x.dot(&hess.apply(&y).unwrap());
            let yhx = y.dot(&hess.apply(&x).unwrap());
            assert!((xhy - yhx).abs() < 1e-10 * xhy.abs().max(1.));
            let xhx = x.dot(&hess.apply(&x).unwrap());
            assert!(xhx >= 1e-4 * x.dot(&x) * (1. - 1e-10));
        }
        assert_eq!(hess.applications(), 9);
    }

    #[test]
    fn test_hessian_is_gradient_difference() {
        // the objective is quadratic: g(x + v) - g(x) = H v
        let ctx = context(1e-3);
        let hess = ReducedHessian::new(&ctx);
        let n = hess.dim();
        let x = random_vector(n, 1.);
        let v = random_vector(n, 1.);
        let obs = random_trajectory(11, 27, 1, 1.);
        let g0 = compute_gradient(&ctx, &x, obs.clone()).unwrap().gradient;
        let g1 = compute_gradient(&ctx, &(&x + &v), obs).unwrap().gradient;
        let hv = hess.apply(&v).unwrap();
        assert!(relative_error(&(&g1 - &g0), &hv) < 1e-8);
    }

    #[test]
    fn test_hessian_pure_regularization() {
        // mask removes all observations, H = beta I
        let ctx = context(0.5).with_mask(Array2::zeros((27, 1))).unwrap();
        let hess = ReducedHessian::new(&ctx);
        let v = random_vector(hess.dim(), 1.);
        let hv = hess.apply(&v).unwrap();
        for (a, b) in hv.iter().zip(v.iter()) {
            assert!((a - 0.5 * b).abs() < 1e-15);
        }
        assert_eq!(hv.len(), 40);
        assert!(matches!(
            hess.apply(&Array1::zeros(3)),
            Err(InverseError::ControlDimension { .. })
        ));
    }
}
