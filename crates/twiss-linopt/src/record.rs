use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use twiss_core::{Mode, Orbit};

use crate::blocks::to_rows;
use crate::decompose::ModalPoint;

/// Row-major 2x2 block.
pub type Block = [[f64; 2]; 2];

/// Linear optics at one reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsRecord {
    /// Reference index into the lattice.
    pub index: usize,
    /// Path position [m].
    pub s: f64,
    /// Alpha of the two transverse modes.
    pub alpha: [f64; 2],
    /// Beta of the two transverse modes [m].
    pub beta: [f64; 2],
    /// Unwrapped phase per mode [rad].
    pub mu: Vec<f64>,
    /// Local coupling strength, coupled analysis only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    /// Mode A block, coupled analysis only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<Block>,
    /// Mode B block, coupled analysis only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Block>,
    /// Coupling matrix, coupled analysis only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<Block>,
    /// Closed orbit.
    pub closed_orbit: Orbit,
    /// `(Dx, Dx', Dy, Dy')`.
    pub dispersion: [f64; 4],
    /// Cumulative transfer matrix from the lattice start.
    pub matrix: DMatrix<f64>,
    /// Chromatic amplitude functions, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<[f64; 2]>,
}

/// Ring-level results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamData {
    /// Fractional tune per mode, in `[0, 1)`.
    pub tune: Vec<f64>,
    /// Transverse chromaticity, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromaticity: Option<[f64; 2]>,
    /// Damping time per mode [s], 6D only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping_time: Option<[f64; 3]>,
}

/// Complete output of a linear optics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearOptics {
    /// Dimension the analysis ran in.
    pub mode: Mode,
    /// Entrance record; carries the one-turn matrix and `s = L`.
    pub start: OpticsRecord,
    /// Tunes, chromaticity and damping times.
    pub beam: BeamData,
    /// One record per reference point, in request order.
    pub points: Vec<OpticsRecord>,
}

pub(crate) struct PointInputs<'a> {
    pub index: usize,
    pub s: f64,
    pub modal: &'a ModalPoint,
    pub orbit: Orbit,
    pub dispersion: [f64; 4],
    pub matrix: DMatrix<f64>,
    pub w: Option<[f64; 2]>,
}

pub(crate) fn assemble(inputs: PointInputs<'_>) -> OpticsRecord {
    let coupling = inputs.modal.coupling.as_ref();
    OpticsRecord {
        index: inputs.index,
        s: inputs.s,
        alpha: inputs.modal.alpha,
        beta: inputs.modal.beta,
        mu: inputs.modal.mu.clone(),
        gamma: coupling.map(|c| c.gamma),
        a: coupling.map(|c| to_rows(&c.a)),
        b: coupling.map(|c| to_rows(&c.b)),
        c: coupling.map(|c| to_rows(&c.c)),
        closed_orbit: inputs.orbit,
        dispersion: inputs.dispersion,
        matrix: inputs.matrix,
        w: inputs.w,
    }
}

impl LinearOptics {
    /// Record at lattice index `index`, if it was requested.
    pub fn point(&self, index: usize) -> Option<&OpticsRecord> {
        self.points.iter().find(|record| record.index == index)
    }
}
