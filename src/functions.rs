//! Some useful helper functions
use crate::field::FieldTrajectory;
use ndarray::{Array1, Array3, ArrayBase, Data, Ix1};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use num_traits::Float;

/// Return l2 norm of a sequence of floats
pub fn norm_l2<'a, A, I>(values: I) -> A
where
    A: Float + 'a,
    I: IntoIterator<Item = &'a A>,
{
    values
        .into_iter()
        .fold(A::zero(), |acc, x| acc + *x * *x)
        .sqrt()
}

/// Return |a - b| / |b|, or |a - b| if b vanishes
pub fn relative_error<S1, S2>(a: &ArrayBase<S1, Ix1>, b: &ArrayBase<S2, Ix1>) -> f64
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    let diff = a - b;
    let nb = norm_l2(b.iter());
    let nd = norm_l2(diff.iter());
    if nb > 0. {
        nd / nb
    } else {
        nd
    }
}

/// Random vector with entries uniform in \[-amp, amp)
///
/// # Panics
/// `amp` is not positive.
pub fn random_vector(n: usize, amp: f64) -> Array1<f64> {
    Array1::random(n, Uniform::new(-amp, amp))
}

/// Random trajectory with entries uniform in \[-amp, amp)
///
/// # Panics
/// `amp` is not positive.
pub fn random_trajectory(
    num_snapshots: usize,
    num_nodes: usize,
    dof: usize,
    amp: f64,
) -> FieldTrajectory {
    FieldTrajectory::from_array(Array3::random(
        (num_snapshots, num_nodes, dof),
        Uniform::new(-amp, amp),
    ))
}

/// Add uniform noise in \[-amp, amp) to a trajectory, amp = 0 leaves it untouched
pub fn add_noise(traj: &mut FieldTrajectory, amp: f64) {
    if amp > 0. {
        let noise = Array3::random(traj.v.raw_dim(), Uniform::new(-amp, amp));
        traj.v += &noise;
    }
}
