//! Clamped uniform B-spline basis in time
use crate::error::{InverseError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// B-spline basis with `num_knots` basis functions of fixed degree.
///
/// The knot vector is clamped (degree + 1 repeated boundary knots)
/// and uniform on the interior of the time interval. The weights at
/// any time are non-negative and sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BSplineSpec", into = "BSplineSpec")]
pub struct BSplineBasis {
    /// Polynomial degree actually used (`min(degree, num_knots - 1)`)
    degree: usize,
    /// Number of basis functions (K)
    num_knots: usize,
    /// Time interval \[t_a, t_b\]
    domain: (f64, f64),
    /// Full knot vector, length K + degree + 1
    knots: Array1<f64>,
}

/// Serialized form of [`BSplineBasis`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BSplineSpec {
    degree: usize,
    num_knots: usize,
    #[serde(default = "default_domain")]
    domain: (f64, f64),
}

fn default_domain() -> (f64, f64) {
    (0., 1.)
}

impl std::convert::TryFrom<BSplineSpec> for BSplineBasis {
    type Error = InverseError;
    fn try_from(spec: BSplineSpec) -> Result<Self> {
        Self::on_interval(spec.degree, spec.num_knots, spec.domain.0, spec.domain.1)
    }
}

impl From<BSplineBasis> for BSplineSpec {
    fn from(b: BSplineBasis) -> Self {
        Self {
            degree: b.degree,
            num_knots: b.num_knots,
            domain: b.domain,
        }
    }
}

impl BSplineBasis {
    /// Return basis on the unit interval \[0, 1\]
    ///
    /// # Errors
    /// `num_knots` is zero.
    ///
    /// # Example
    ///```
    /// use elasinv::bases::BSplineBasis;
    /// let basis = BSplineBasis::new(3, 5).unwrap();
    /// let w = basis.basis(0.3);
    /// assert_eq!(w.len(), 5);
    /// assert!((w.sum() - 1.).abs() < 1e-12);
    ///```
    pub fn new(degree: usize, num_knots: usize) -> Result<Self> {
        Self::on_interval(degree, num_knots, 0., 1.)
    }

    /// Return basis on the interval \[t_a, t_b\]
    ///
    /// # Errors
    /// `num_knots` is zero or the interval is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn on_interval(degree: usize, num_knots: usize, t_a: f64, t_b: f64) -> Result<Self> {
        if num_knots == 0 {
            return Err(InverseError::Basis(
                "temporal basis needs at least one knot".to_owned(),
            ));
        }
        if !(t_a.is_finite() && t_b.is_finite()) || t_b <= t_a {
            return Err(InverseError::Basis(format!(
                "invalid temporal interval [{}, {}]",
                t_a, t_b
            )));
        }
        let degree = degree.min(num_knots - 1);
        let n_internal = num_knots - degree - 1;
        let h = (t_b - t_a) / (n_internal + 1) as f64;
        let mut knots = Vec::with_capacity(num_knots + degree + 1);
        for _ in 0..=degree {
            knots.push(t_a);
        }
        for i in 1..=n_internal {
            knots.push(t_a + i as f64 * h);
        }
        for _ in 0..=degree {
            knots.push(t_b);
        }
        Ok(Self {
            degree,
            num_knots,
            domain: (t_a, t_b),
            knots: Array1::from(knots),
        })
    }

    /// Number of basis functions
    pub fn num_knots(&self) -> usize {
        self.num_knots
    }

    /// Polynomial degree
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Time interval
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Full (clamped) knot vector
    pub fn knot_vector(&self) -> &Array1<f64> {
        &self.knots
    }

    /// Return weights of all basis functions at time `t`
    pub fn basis(&self, t: f64) -> Array1<f64> {
        let mut out = Array1::zeros(self.num_knots);
        if let Some(s) = out.as_slice_mut() {
            self.basis_into(t, s);
        }
        out
    }

    /// Write weights of all basis functions at time `t` into `out`.
    ///
    /// Times outside the interval are clamped to its boundary.
    /// Cox-de Boor recursion (Piegl & Tiller, algorithm A2.2).
    ///
    /// # Panics
    /// `out.len()` differs from the number of knots.
    pub fn basis_into(&self, t: f64, out: &mut [f64]) {
        assert_eq!(out.len(), self.num_knots, "basis buffer has wrong size");
        let p = self.degree;
        let n = self.num_knots;
        let knots = &self.knots;
        let x = t.max(self.domain.0).min(self.domain.1);

        // knot span
        let span = if x >= knots[n] {
            n - 1
        } else {
            let mut span = p;
            while span < n - 1 && x >= knots[span + 1] {
                span += 1;
            }
            span
        };

        let mut nval = vec![0.; p + 1];
        let mut left = vec![0.; p + 1];
        let mut right = vec![0.; p + 1];
        nval[0] = 1.;
        for j in 1..=p {
            left[j] = x - knots[span + 1 - j];
            right[j] = knots[span + j] - x;
            let mut saved = 0.;
            for r in 0..j {
                let temp = nval[r] / (right[r + 1] + left[j - r]);
                nval[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            nval[j] = saved;
        }

        for v in out.iter_mut() {
            *v = 0.;
        }
        for (i, v) in nval.iter().enumerate() {
            out[span - p + i] = *v;
        }
    }
}
