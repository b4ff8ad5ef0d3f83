use serde::{Deserialize, Serialize};

/// Phase-space vector `(x, px, y, py, delta, ct)`.
pub type Orbit = [f64; 6];

/// Dimension of the linear analysis, selected once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Transverse 4x4 analysis at fixed momentum.
    #[serde(rename = "4d")]
    Mode4D,
    /// Full 6x6 analysis including longitudinal motion.
    #[serde(rename = "6d")]
    Mode6D,
}

impl Mode {
    /// Side length of the transfer matrices handled in this mode.
    pub fn dimension(&self) -> usize {
        match self {
            Mode::Mode4D => 4,
            Mode::Mode6D => 6,
        }
    }
}

fn default_dp_step() -> f64 {
    1e-6
}

fn default_xy_step() -> f64 {
    1e-8
}

fn default_orbit_tolerance() -> f64 {
    1e-12
}

fn default_max_iterations() -> usize {
    20
}

/// Numerical steps and bounds shared by the engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Relative momentum step for dispersion and chromaticity differencing.
    #[serde(default = "default_dp_step")]
    pub dp_step: f64,
    /// Transverse step for numerical transfer matrices and Jacobians.
    #[serde(default = "default_xy_step")]
    pub xy_step: f64,
    /// Convergence threshold on the orbit correction.
    #[serde(default = "default_orbit_tolerance")]
    pub orbit_tolerance: f64,
    /// Iteration cap of the closed-orbit search.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            dp_step: default_dp_step(),
            xy_step: default_xy_step(),
            orbit_tolerance: default_orbit_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Physical class of a lattice segment, as far as the optics needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentClass {
    /// Field-free region.
    Drift,
    /// Bending magnet.
    Dipole,
    /// Normal or skew quadrupole.
    Quadrupole,
    /// Sextupole.
    Sextupole,
    /// RF cavity.
    Cavity,
    /// Anything else (markers, lumped radiation, ...).
    Other,
}

/// Length, class and focusing strength of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Segment length [m].
    pub length: f64,
    /// Physical class.
    pub class: SegmentClass,
    /// Normal quadrupole gradient `k` [m^-2]; zero when not focusing.
    pub strength: f64,
}
