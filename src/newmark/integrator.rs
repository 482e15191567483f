//! Central difference integrator
use super::stiffness::{assemble_stiffness, gershgorin_bound};
use super::Material;
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use crate::layout::{Layout, NodeLayout};
use crate::types::{SolveMode, TimeInfo};
use crate::TimeStepper;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use sprs::CsMat;

/// Explicit Newmark time stepper.
///
/// With `c = alpha dt / 2` and lumped mass `m` the update reads
/// $$
/// (1 + c) u_{n+1} = 2 u_n - (1 - c) u_{n-1} + \frac{\Delta t^2}{m} (f_n - K u_n)
/// $$
/// started from `u_{-1} = u_0 - dt v_0`. For zero initial conditions
/// the solution operator is block lower triangular Toeplitz with
/// symmetric blocks, so its transpose is obtained by reversing the
/// forcing in time, integrating forward and reversing the result.
/// This is how [`SolveMode::Adjoint`] is evaluated. Initial conditions
/// of an adjoint solve act as terminal conditions at stop time.
///
/// The scheme is serial and owns all nodes of its layout.
#[derive(Debug, Clone)]
pub struct Newmark {
    layout: Layout,
    time: TimeInfo,
    dof: usize,
    material: Material,
    stiffness: CsMat<f64>,
}

impl Newmark {
    /// Return new stepper and assemble its stiffness.
    ///
    /// Logs a warning if the time step exceeds [`Self::critical_timestep`].
    ///
    /// # Errors
    /// Invalid time info, zero degrees of freedom, non-positive density
    /// or negative stiffness / damping.
    pub fn new(layout: Layout, time: TimeInfo, dof: usize, material: Material) -> Result<Self> {
        time.validate()?;
        if dof == 0 {
            return Err(InverseError::Config(
                "degrees of freedom must be positive".to_owned(),
            ));
        }
        if !(material.density > 0.)
            || !(material.stiffness >= 0.)
            || !(material.damping >= 0.)
        {
            return Err(InverseError::Config(format!(
                "invalid material {:?}",
                material
            )));
        }
        let stiffness = assemble_stiffness(&layout, material.stiffness);
        let stepper = Self {
            layout,
            time,
            dof,
            material,
            stiffness,
        };
        let dt_crit = stepper.critical_timestep();
        if time.step > dt_crit {
            log::warn!(
                "time step {} exceeds critical time step {:.4e}, explicit scheme is unstable",
                time.step,
                dt_crit
            );
        }
        log::debug!(
            "newmark: {} nodes, {} dof, {} steps, critical dt {:.4e}",
            stepper.layout.num_nodes(),
            dof,
            time.num_steps(),
            dt_crit
        );
        Ok(stepper)
    }

    /// Material parameters
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Assembled stiffness operator (scalar, per component)
    pub fn stiffness(&self) -> &CsMat<f64> {
        &self.stiffness
    }

    /// Stability limit `2 / omega_max` of the central difference
    /// scheme, with `omega_max^2` bounded by Gershgorin's theorem.
    /// Infinite without stiffness.
    pub fn critical_timestep(&self) -> f64 {
        let lam = gershgorin_bound(&self.stiffness) / self.material.density;
        if lam > 0. {
            2. / lam.sqrt()
        } else {
            f64::INFINITY
        }
    }

    /// out = K u, column wise
    fn apply_stiffness(&self, u: &ArrayView2<f64>, out: &mut Array2<f64>) {
        out.fill(0.);
        for (i, row) in self.stiffness.outer_iterator().enumerate() {
            let mut out_i = out.row_mut(i);
            for (j, k) in row.iter() {
                out_i.scaled_add(*k, &u.row(j));
            }
        }
    }

    fn integrate(
        &self,
        forcing: &FieldTrajectory,
        init_disp: &ArrayView2<f64>,
        init_vel: &ArrayView2<f64>,
    ) -> FieldTrajectory {
        let nt = forcing.num_snapshots();
        let np = self.layout.num_nodes();
        let dt = self.time.step;
        let c = 0.5 * self.material.damping * dt;
        let dt2m = dt * dt / self.material.density;

        let mut out = FieldTrajectory::zeros(nt, np, self.dof);
        if nt == 0 {
            return out;
        }
        out.snapshot_mut(0).assign(init_disp);
        let mut prev = init_disp - &(init_vel * dt);
        let mut ku = Array2::zeros((np, self.dof));
        for n in 0..nt - 1 {
            let (done, mut rest) = out.v.view_mut().split_at(Axis(0), n + 1);
            let cur = done.index_axis(Axis(0), n);
            self.apply_stiffness(&cur, &mut ku);
            Zip::from(rest.index_axis_mut(Axis(0), 0))
                .and(&cur)
                .and(&prev)
                .and(&forcing.snapshot(n))
                .and(&ku)
                .for_each(|next, &u, &um, &f, &k| {
                    *next = (2. * u - (1. - c) * um + dt2m * (f - k)) / (1. + c);
                });
            prev.assign(&cur);
        }
        out
    }

    fn check_initial(&self, field: &ArrayView2<f64>) -> Result<()> {
        let shape = [self.layout.num_nodes(), self.dof];
        if field.shape() == shape {
            Ok(())
        } else {
            Err(InverseError::FieldShape {
                expected: shape.to_vec(),
                found: field.shape().to_vec(),
            })
        }
    }
}

impl TimeStepper for Newmark {
    fn time_info(&self) -> TimeInfo {
        self.time
    }

    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn dof(&self) -> usize {
        self.dof
    }

    fn solve(
        &self,
        forcing: &FieldTrajectory,
        init_disp: ArrayView2<f64>,
        init_vel: ArrayView2<f64>,
        mode: SolveMode,
    ) -> Result<FieldTrajectory> {
        forcing.check_shape(
            self.time.num_snapshots(),
            self.layout.num_nodes(),
            self.dof,
        )?;
        self.check_initial(&init_disp)?;
        self.check_initial(&init_vel)?;
        let state = match mode {
            SolveMode::Forward => self.integrate(forcing, &init_disp, &init_vel),
            SolveMode::Adjoint => self
                .integrate(&forcing.reversed(), &init_disp, &init_vel)
                .reversed(),
        };
        if state.v.iter().any(|x| !x.is_finite()) {
            return Err(InverseError::Solver(format!(
                "{:?} solve diverged, time step {} vs critical {:.4e}",
                mode,
                self.time.step,
                self.critical_timestep()
            )));
        }
        log::debug!(
            "{:?} solve: |f| = {:.6e}, |u| = {:.6e}",
            mode,
            forcing.norm_l2(),
            state.norm_l2()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::random_trajectory;
    use crate::layout::{GridLayout, TreeLayout};

    fn approx_eq(result: f64, expected: f64) {
        let dif = 1e-12 * expected.abs().max(1.);
        if (result - expected).abs() > dif {
            panic!(
                "Large difference of values, got {} expected {}.",
                result, expected
            )
        }
    }

    fn single_node(density: f64, time: TimeInfo) -> Newmark {
        let layout: Layout = GridLayout::new([1, 1, 1]).unwrap().into();
        let material = Material {
            density,
            stiffness: 0.,
            damping: 0.,
        };
        Newmark::new(layout, time, 1, material).unwrap()
    }

    #[test]
    fn test_invalid_material() {
        let time = TimeInfo::new(0., 1., 0.1).unwrap();
        let materials = [
            Material {
                stiffness: f64::NAN,
                ..Material::default()
            },
            Material {
                damping: f64::NAN,
                ..Material::default()
            },
            Material {
                density: f64::NAN,
                ..Material::default()
            },
            Material {
                stiffness: -0.1,
                ..Material::default()
            },
            Material {
                density: 0.,
                ..Material::default()
            },
        ];
        for material in materials.iter() {
            let layout: Layout = GridLayout::new([2, 2, 2]).unwrap().into();
            assert!(matches!(
                Newmark::new(layout, time, 1, *material),
                Err(InverseError::Config(_))
            ));
        }
    }

    #[test]
    fn test_unstable_step_fails() {
        let layout: Layout = GridLayout::new([9, 9, 9]).unwrap().into();
        let time = TimeInfo::new(0., 2000., 1.).unwrap();
        let material = Material {
            density: 1.,
            stiffness: 1.,
            damping: 0.,
        };
        let ts = Newmark::new(layout, time, 1, material).unwrap();
        assert!(ts.critical_timestep() < time.step);
        let zero = Array2::zeros((729, 1));
        let f = random_trajectory(2001, 729, 1, 1.);
        assert!(matches!(
            ts.solve(&f, zero.view(), zero.view(), SolveMode::Forward),
            Err(InverseError::Solver(_))
        ));
    }

    #[test]
    fn test_constant_force() {
        let time = TimeInfo::new(0., 0.5, 0.1).unwrap();
        let ts = single_node(2., time);
        assert_eq!(ts.critical_timestep(), f64::INFINITY);
        let f = FieldTrajectory::from_snapshot(&Array2::from_elem((1, 1), 3.), 6);
        let zero = Array2::zeros((1, 1));
        let u = ts
            .solve(&f, zero.view(), zero.view(), SolveMode::Forward)
            .unwrap();
        let a = 0.1 * 0.1 * 3. / 2.;
        for n in 0..6 {
            approx_eq(u.v[[n, 0, 0]], a * (n * (n + 1) / 2) as f64);
        }
    }

    #[test]
    fn test_initial_velocity() {
        let time = TimeInfo::new(0., 1., 0.25).unwrap();
        let ts = single_node(1., time);
        let f = FieldTrajectory::zeros(5, 1, 1);
        let u0 = Array2::from_elem((1, 1), 1.);
        let v0 = Array2::from_elem((1, 1), 2.);
        let u = ts.solve(&f, u0.view(), v0.view(), SolveMode::Forward).unwrap();
        for n in 0..5 {
            approx_eq(u.v[[n, 0, 0]], 1. + 2. * 0.25 * n as f64);
        }
    }

    #[test]
    fn test_zero_in_zero_out() {
        let layout: Layout = GridLayout::new([3, 3, 3]).unwrap().into();
        let ts = Newmark::new(layout, TimeInfo::default(), 3, Material::default()).unwrap();
        let zero = Array2::zeros((27, 3));
        for mode in [SolveMode::Forward, SolveMode::Adjoint].iter() {
            let u = ts
                .solve(
                    &FieldTrajectory::zeros(11, 27, 3),
                    zero.view(),
                    zero.view(),
                    *mode,
                )
                .unwrap();
            assert_eq!(u.norm_l2(), 0.);
        }
    }

    #[test]
    fn test_adjoint_is_transpose() {
        let layouts: Vec<Layout> = vec![
            GridLayout::new([3, 3, 4]).unwrap().into(),
            TreeLayout::uniform(1, 3).unwrap().into(),
        ];
        let material = Material {
            density: 1.5,
            stiffness: 0.05,
            damping: 0.3,
        };
        let time = TimeInfo::new(0., 1., 0.1).unwrap();
        for layout in layouts {
            let np = layout.num_nodes();
            let ts = Newmark::new(layout, time, 2, material).unwrap();
            assert!(time.step < ts.critical_timestep());
            let zero = Array2::zeros((np, 2));
            let f = random_trajectory(11, np, 2, 1.);
            let g = random_trajectory(11, np, 2, 1.);
            let sf = ts
                .solve(&f, zero.view(), zero.view(), SolveMode::Forward)
                .unwrap();
            let stg = ts
                .solve(&g, zero.view(), zero.view(), SolveMode::Adjoint)
                .unwrap();
            approx_eq(sf.dot(&g).unwrap(), f.dot(&stg).unwrap());
        }
    }

    #[test]
    fn test_shape_errors() {
        let layout: Layout = GridLayout::new([2, 2, 2]).unwrap().into();
        let ts = Newmark::new(layout, TimeInfo::default(), 3, Material::default()).unwrap();
        let zero = Array2::zeros((8, 3));
        assert!(matches!(
            ts.solve(
                &FieldTrajectory::zeros(10, 8, 3),
                zero.view(),
                zero.view(),
                SolveMode::Forward
            ),
            Err(InverseError::TrajectoryLength { .. })
        ));
        let bad = Array2::zeros((8, 1));
        assert!(matches!(
            ts.solve(
                &FieldTrajectory::zeros(11, 8, 3),
                bad.view(),
                zero.view(),
                SolveMode::Forward
            ),
            Err(InverseError::FieldShape { .. })
        ));
        let material = Material {
            density: 0.,
            ..Material::default()
        };
        let layout: Layout = GridLayout::new([2, 2, 2]).unwrap().into();
        assert!(Newmark::new(layout, TimeInfo::default(), 3, material).is_err());
    }
}
