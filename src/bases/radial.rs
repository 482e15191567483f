//! Localized radial weighting functions
use crate::error::{InverseError, Result};
use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Radial profile of a spatial basis function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// exp(-r^2/2), never exactly zero
    Gaussian,
    /// Wendland C2 function (1-r)^4 (4r+1), zero for r >= 1
    Wendland,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::Gaussian
    }
}

impl Kernel {
    /// Evaluate profile at squared scaled distance
    fn profile(self, r2: f64) -> f64 {
        match self {
            Self::Gaussian => (-0.5 * r2).exp(),
            Self::Wendland => {
                if r2 >= 1. {
                    0.
                } else {
                    let r = r2.sqrt();
                    (1. - r).powi(4) * (4. * r + 1.)
                }
            }
        }
    }
}

/// Spatial basis function with center and per axis width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialBasis {
    /// Center in normalised coordinates
    pub center: Point,
    /// Width along each axis
    pub width: Point,
    /// Radial profile
    #[serde(default)]
    pub kernel: Kernel,
}

impl RadialBasis {
    /// Return new gaussian basis function
    ///
    /// # Errors
    /// Width not strictly positive or non-finite input.
    pub fn new(center: Point, width: Point) -> Result<Self> {
        Self::with_kernel(center, width, Kernel::Gaussian)
    }

    /// Return new basis function with given profile
    ///
    /// # Errors
    /// Width not strictly positive or non-finite input.
    pub fn with_kernel(center: Point, width: Point, kernel: Kernel) -> Result<Self> {
        let basis = Self {
            center,
            width,
            kernel,
        };
        basis.validate()?;
        Ok(basis)
    }

    /// Check center and width
    ///
    /// # Errors
    /// Width not strictly positive or non-finite input.
    pub fn validate(&self) -> Result<()> {
        if self.center.iter().any(|c| !c.is_finite()) {
            return Err(InverseError::Basis(format!(
                "center must be finite, got {:?}",
                self.center
            )));
        }
        if self.width.iter().any(|w| !w.is_finite() || *w <= 0.) {
            return Err(InverseError::Basis(format!(
                "width must be positive, got {:?}",
                self.width
            )));
        }
        Ok(())
    }

    /// Weight at point `x`
    pub fn evaluate(&self, x: &Point) -> f64 {
        let mut r2 = 0.;
        for i in 0..3 {
            let s = (x[i] - self.center[i]) / self.width[i];
            r2 += s * s;
        }
        self.kernel.profile(r2)
    }
}

/// Ordered set of spatial basis functions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialBasisSet {
    functions: Vec<RadialBasis>,
}

impl SpatialBasisSet {
    /// Return new set
    ///
    /// # Errors
    /// Any basis function is invalid.
    pub fn new(functions: Vec<RadialBasis>) -> Result<Self> {
        for f in &functions {
            f.validate()?;
        }
        Ok(Self { functions })
    }

    /// Regular lattice of n^3 functions, with centers at
    /// (i + 1/2) / n and half the lattice spacing as width.
    ///
    /// # Example
    ///```
    /// use elasinv::bases::{Kernel, SpatialBasisSet};
    /// let set = SpatialBasisSet::lattice(2, Kernel::Gaussian);
    /// assert_eq!(set.len(), 8);
    /// assert_eq!(set.get(0).unwrap().center, [0.25, 0.25, 0.25]);
    ///```
    #[allow(clippy::cast_precision_loss)]
    pub fn lattice(n: usize, kernel: Kernel) -> Self {
        let fac = 1. / n as f64;
        let mut functions = Vec::with_capacity(n * n * n);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    functions.push(RadialBasis {
                        center: [
                            fac / 2. + i as f64 * fac,
                            fac / 2. + j as f64 * fac,
                            fac / 2. + k as f64 * fac,
                        ],
                        width: [fac / 2.; 3],
                        kernel,
                    });
                }
            }
        }
        Self { functions }
    }

    /// Number of basis functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True if set contains no functions
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Get basis function `b`
    pub fn get(&self, b: usize) -> Option<&RadialBasis> {
        self.functions.get(b)
    }

    /// Iterate over basis functions
    pub fn iter(&self) -> std::slice::Iter<'_, RadialBasis> {
        self.functions.iter()
    }

    /// Weight of basis `b` at point `x`
    ///
    /// # Panics
    /// `b` out of range.
    pub fn evaluate(&self, b: usize, x: &Point) -> f64 {
        self.functions[b].evaluate(x)
    }
}
