//! Conjugate gradient method
use super::LinearOperator;
use crate::error::{InverseError, Result};
use crate::functions::norm_l2;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Stopping criteria of the conjugate gradient method.
///
/// Iteration stops once `|r| <= max(rtol * |b|, atol)`
/// or after `max_iter` iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgConfig {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Iteration cap
    pub max_iter: usize,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-50,
            max_iter: 10_000,
        }
    }
}

/// Outcome of a conjugate gradient solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgResult {
    /// Number of operator applications inside the iteration
    pub iterations: usize,
    /// Norm of the final residual
    pub residual_norm: f64,
    /// Stopping criterion reached
    pub converged: bool,
}

/// Conjugate gradient solver for symmetric positive definite operators
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradient {
    config: CgConfig,
}

impl ConjugateGradient {
    /// Return new solver
    pub fn new(config: CgConfig) -> Self {
        Self { config }
    }

    /// Stopping criteria
    pub fn config(&self) -> &CgConfig {
        &self.config
    }

    /// Solve `A x = b`, starting from the content of `x`.
    ///
    /// Missing convergence is not an error, it is logged and
    /// reported in the returned [`CgResult`].
    ///
    /// # Errors
    /// Vector lengths differ from the operator dimension,
    /// or the operator failed.
    ///
    /// # Example
    ///```
    /// use elasinv::solver::{CgConfig, ConjugateGradient};
    /// use ndarray::{array, Array1};
    ///
    /// let a = array![[4., 1.], [1., 3.]];
    /// let b = array![1., 2.];
    /// let mut x = Array1::zeros(2);
    /// let cg = ConjugateGradient::new(CgConfig::default());
    /// let res = cg.solve(&a, &b, &mut x).unwrap();
    /// assert!(res.converged);
    /// assert!((x[0] - 1. / 11.).abs() < 1e-6);
    /// assert!((x[1] - 7. / 11.).abs() < 1e-6);
    ///```
    pub fn solve<A>(&self, op: &A, rhs: &Array1<f64>, x: &mut Array1<f64>) -> Result<CgResult>
    where
        A: LinearOperator + ?Sized,
    {
        let n = op.dim();
        for len in [rhs.len(), x.len()].iter() {
            if *len != n {
                return Err(InverseError::ControlDimension {
                    expected: n,
                    found: *len,
                });
            }
        }

        let b_norm = norm_l2(rhs.iter());
        if b_norm == 0. {
            x.fill(0.);
            return Ok(CgResult {
                iterations: 0,
                residual_norm: 0.,
                converged: true,
            });
        }
        let tol = (self.config.rtol * b_norm).max(self.config.atol);

        // r = b - A x
        let mut r = rhs.clone();
        if x.iter().any(|v| *v != 0.) {
            r -= &op.apply(x)?;
        }
        let mut rr = r.dot(&r);
        if rr.sqrt() <= tol {
            return Ok(CgResult {
                iterations: 0,
                residual_norm: rr.sqrt(),
                converged: true,
            });
        }

        let mut p = r.clone();
        for it in 1..=self.config.max_iter {
            let ap = op.apply(&p)?;
            let pap = p.dot(&ap);
            if pap <= 0. || pap.is_nan() {
                log::warn!(
                    "cg breakdown in iteration {}: p^T A p = {:e}, operator not positive definite",
                    it,
                    pap
                );
                return Ok(CgResult {
                    iterations: it,
                    residual_norm: rr.sqrt(),
                    converged: false,
                });
            }
            let alpha = rr / pap;
            x.scaled_add(alpha, &p);
            r.scaled_add(-alpha, &ap);
            let rr_new = r.dot(&r);
            log::trace!("cg iteration {:>5}: |r| = {:e}", it, rr_new.sqrt());
            if rr_new.sqrt() <= tol {
                log::debug!(
                    "cg converged in {} iterations, |r| = {:e}",
                    it,
                    rr_new.sqrt()
                );
                return Ok(CgResult {
                    iterations: it,
                    residual_norm: rr_new.sqrt(),
                    converged: true,
                });
            }
            let beta = rr_new / rr;
            p.mapv_inplace(|v| v * beta);
            p += &r;
            rr = rr_new;
        }

        log::warn!(
            "cg not converged after {} iterations, |r| = {:e} > {:e}",
            self.config.max_iter,
            rr.sqrt(),
            tol
        );
        Ok(CgResult {
            iterations: self.config.max_iter,
            residual_norm: rr.sqrt(),
            converged: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn approx_eq(result: &Array1<f64>, expected: &Array1<f64>) {
        let dif = 1e-8;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a - b).abs() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    /// 1d laplacian, tridiagonal (-1, 2, -1)
    fn laplacian(n: usize) -> Array2<f64> {
        let mut a = Array2::zeros((n, n));
        for i in 0..n {
            a[[i, i]] = 2.;
            if i > 0 {
                a[[i, i - 1]] = -1.;
                a[[i - 1, i]] = -1.;
            }
        }
        a
    }

    #[test]
    fn test_cg_dense_spd() {
        let a = laplacian(8);
        let expected = Array1::linspace(-1., 2., 8);
        let b = a.dot(&expected);
        let cg = ConjugateGradient::new(CgConfig {
            rtol: 1e-12,
            ..CgConfig::default()
        });
        let mut x = Array1::zeros(8);
        let res = cg.solve(&a, &b, &mut x).unwrap();
        assert!(res.converged);
        assert!(res.iterations < 20);
        approx_eq(&x, &expected);
    }

    #[test]
    fn test_cg_initial_guess() {
        let a = array![[4., 1.], [1., 3.]];
        let b = array![1., 2.];
        let expected = array![1. / 11., 7. / 11.];
        let mut x = expected.clone();
        let res = ConjugateGradient::default().solve(&a, &b, &mut x).unwrap();
        assert!(res.converged);
        assert_eq!(res.iterations, 0);
        approx_eq(&x, &expected);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let a = laplacian(4);
        let mut x = array![1., 2., 3., 4.];
        let res = ConjugateGradient::default()
            .solve(&a, &Array1::zeros(4), &mut x)
            .unwrap();
        assert!(res.converged);
        assert_eq!(res.iterations, 0);
        assert_eq!(x, Array1::<f64>::zeros(4));
    }

    #[test]
    fn test_cg_iteration_cap() {
        let a = laplacian(20);
        let b = Array1::ones(20);
        let cg = ConjugateGradient::new(CgConfig {
            rtol: 1e-14,
            atol: 0.,
            max_iter: 2,
        });
        let mut x = Array1::zeros(20);
        let res = cg.solve(&a, &b, &mut x).unwrap();
        assert!(!res.converged);
        assert_eq!(res.iterations, 2);
        assert!(res.residual_norm > 0.);
    }

    #[test]
    fn test_cg_indefinite() {
        let a = array![[1., 0.], [0., -1.]];
        let b = array![0., 1.];
        let mut x = Array1::zeros(2);
        let res = ConjugateGradient::default().solve(&a, &b, &mut x).unwrap();
        assert!(!res.converged);
    }

    #[test]
    fn test_cg_dimension_mismatch() {
        let a = laplacian(3);
        let mut x = Array1::zeros(3);
        assert!(matches!(
            ConjugateGradient::default().solve(&a, &Array1::ones(4), &mut x),
            Err(InverseError::ControlDimension {
                expected: 3,
                found: 4
            })
        ));
    }

    #[test]
    fn test_config_defaults() {
        let cfg: CgConfig = serde_json::from_str(r#"{"max_iter": 50}"#).unwrap();
        assert_eq!(cfg.max_iter, 50);
        assert_eq!(cfg.rtol, 1e-5);
        assert_eq!(cfg.atol, 1e-50);
    }
}
