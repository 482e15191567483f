//! # Configuration
//! Parameters of a synthetic inversion run, read from json.
//!
//! Every field has a default, `{}` is a valid configuration:
//! a 9x9x9 grid, 3 dof, t in \[0, 1\] with step 0.1, a 2x2x2 lattice of
//! gaussian bases, cubic B-splines with 5 knots and beta = 1e-6.
//!
//! # Example
//!```
//! use elasinv::config::InversionConfig;
//! let cfg: InversionConfig = serde_json::from_str(
//!     r#"{"layout": {"kind": "tree", "level": 2, "max_depth": 4}, "dof": 1}"#,
//! )
//! .unwrap();
//! assert_eq!(cfg.dof, 1);
//! assert_eq!(cfg.beta, 1e-6);
//!```
use crate::bases::{BSplineBasis, Kernel, RadialBasis, SpatialBasisSet};
use crate::error::{InverseError, Result};
use crate::layout::{GridLayout, Layout, NodeLayout, TreeLayout};
use crate::newmark::{Material, Newmark};
use crate::solver::CgConfig;
use crate::types::{Point, TimeInfo};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Node layout of the forward model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutConfig {
    /// Structured grid with `dims` nodes
    Grid {
        /// Nodes along x, y and z
        dims: [usize; 3],
    },
    /// Uniformly refined octree
    Tree {
        /// Refinement level of all octants
        level: u8,
        /// Maximum depth of the tree
        max_depth: u8,
    },
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::Grid { dims: [9, 9, 9] }
    }
}

/// Spatial basis functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpatialConfig {
    /// Regular lattice of `lattice^3` functions
    Lattice {
        /// Functions per axis
        lattice: usize,
        /// Radial profile
        #[serde(default)]
        kernel: Kernel,
    },
    /// Explicit list
    Explicit {
        /// Centers, widths and profiles
        functions: Vec<RadialBasis>,
    },
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self::Lattice {
            lattice: 2,
            kernel: Kernel::Gaussian,
        }
    }
}

/// Temporal B-spline basis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Polynomial degree
    pub degree: usize,
    /// Number of basis functions
    pub knots: usize,
    /// Time interval of the basis, defaults to the time bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<(f64, f64)>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            degree: 3,
            knots: 5,
            domain: None,
        }
    }
}

/// Box of observed nodes, all other nodes are masked out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Lower corner
    pub lower: Point,
    /// Upper corner
    pub upper: Point,
}

/// Parameters of a synthetic inversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversionConfig {
    /// Node layout
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Degrees of freedom per node
    #[serde(default = "default_dof")]
    pub dof: usize,
    /// Time bounds and step size
    #[serde(default)]
    pub time: TimeInfo,
    /// Material of the reference time stepper
    #[serde(default)]
    pub material: Material,
    /// Spatial basis
    #[serde(default)]
    pub spatial: SpatialConfig,
    /// Temporal basis
    #[serde(default)]
    pub temporal: TemporalConfig,
    /// Regularization coefficient
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Stopping criteria of the linear solve
    #[serde(default)]
    pub cg: CgConfig,
    /// Amplitude of uniform noise added to the synthetic observations
    #[serde(default)]
    pub noise: f64,
    /// Observed region, everything is observed if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskConfig>,
    /// Hdf5 file for control and observations (feature `hdf5`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

fn default_dof() -> usize {
    3
}

fn default_beta() -> f64 {
    1e-6
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            dof: default_dof(),
            time: TimeInfo::default(),
            material: Material::default(),
            spatial: SpatialConfig::default(),
            temporal: TemporalConfig::default(),
            beta: default_beta(),
            cg: CgConfig::default(),
            noise: 0.,
            mask: None,
            output: None,
        }
    }
}

impl InversionConfig {
    /// Load from json file
    ///
    /// # Errors
    /// File not readable, invalid json or invalid parameters.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameters which are not checked by the constructors
    ///
    /// # Errors
    /// Zero dof, negative beta or noise, or invalid time info.
    pub fn validate(&self) -> Result<()> {
        self.time.validate()?;
        if self.dof == 0 {
            return Err(InverseError::Config("dof must be positive".to_owned()));
        }
        if !(self.beta >= 0.) {
            return Err(InverseError::Config(format!(
                "beta must be non-negative, got {}",
                self.beta
            )));
        }
        if !(self.noise >= 0.) {
            return Err(InverseError::Config(format!(
                "noise must be non-negative, got {}",
                self.noise
            )));
        }
        Ok(())
    }

    /// Build node layout
    ///
    /// # Errors
    /// Invalid dimensions or tree depth.
    pub fn build_layout(&self) -> Result<Layout> {
        Ok(match self.layout {
            LayoutConfig::Grid { dims } => GridLayout::new(dims)?.into(),
            LayoutConfig::Tree { level, max_depth } => {
                TreeLayout::uniform(level, max_depth)?.into()
            }
        })
    }

    /// Build spatial basis set
    ///
    /// # Errors
    /// Empty lattice or invalid basis function.
    pub fn build_spatial(&self) -> Result<SpatialBasisSet> {
        match &self.spatial {
            SpatialConfig::Lattice { lattice, kernel } => {
                if *lattice == 0 {
                    return Err(InverseError::Basis("lattice must be positive".to_owned()));
                }
                Ok(SpatialBasisSet::lattice(*lattice, *kernel))
            }
            SpatialConfig::Explicit { functions } => SpatialBasisSet::new(functions.clone()),
        }
    }

    /// Build temporal basis, on the time bounds unless a domain is given
    ///
    /// # Errors
    /// No knots or empty interval.
    pub fn build_temporal(&self) -> Result<BSplineBasis> {
        let (t_a, t_b) = self
            .temporal
            .domain
            .unwrap_or((self.time.start, self.time.stop));
        BSplineBasis::on_interval(self.temporal.degree, self.temporal.knots, t_a, t_b)
    }

    /// Build reference time stepper on `layout`
    ///
    /// # Errors
    /// Invalid material or time info.
    pub fn build_stepper(&self, layout: Layout) -> Result<Newmark> {
        Newmark::new(layout, self.time, self.dof, self.material)
    }

    /// Observation mask on `layout`, `None` if everything is observed
    pub fn build_mask(&self, layout: &Layout) -> Option<Array2<f64>> {
        self.mask.as_ref().map(|m| {
            let mut mask = Array2::zeros((layout.num_nodes(), self.dof));
            for (p, mut row) in mask.outer_iter_mut().enumerate() {
                let x = layout.node_point(p);
                if (0..3).all(|i| x[i] >= m.lower[i] && x[i] <= m.upper[i]) {
                    row.fill(1.);
                }
            }
            mask
        })
    }
}
