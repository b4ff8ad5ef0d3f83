use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use twiss_core::{OpticsError, SPEED_OF_LIGHT};

use crate::element::Element;
use crate::ring::Ring;

fn default_cells() -> usize {
    16
}

fn default_k() -> f64 {
    1.2
}

fn default_quad_length() -> f64 {
    0.5
}

fn default_drift_length() -> f64 {
    0.4
}

fn default_bend_length() -> f64 {
    1.5
}

fn default_energy() -> f64 {
    1e9
}

/// Parameters of the symmetric FODO test ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FodoParams {
    /// Number of cells; each holds two bends of `2 pi / (2 cells)`.
    #[serde(default = "default_cells")]
    pub cells: usize,
    /// Quadrupole gradient magnitude [m^-2].
    #[serde(default = "default_k")]
    pub k: f64,
    /// Quadrupole length [m].
    #[serde(default = "default_quad_length")]
    pub quad_length: f64,
    /// Drift length between magnets [m].
    #[serde(default = "default_drift_length")]
    pub drift_length: f64,
    /// Dipole length [m].
    #[serde(default = "default_bend_length")]
    pub bend_length: f64,
    /// Beam energy [eV].
    #[serde(default = "default_energy")]
    pub energy: f64,
}

impl Default for FodoParams {
    fn default() -> Self {
        Self {
            cells: default_cells(),
            k: default_k(),
            quad_length: default_quad_length(),
            drift_length: default_drift_length(),
            bend_length: default_bend_length(),
            energy: default_energy(),
        }
    }
}

/// One FODO cell: QF, drift, bend, drift, QD, drift, bend, drift.
pub fn fodo_cell(params: &FodoParams) -> Vec<Element> {
    let angle = TAU / (2 * params.cells.max(1)) as f64;
    let drift = Element::Drift {
        length: params.drift_length,
    };
    let bend = Element::Dipole {
        length: params.bend_length,
        angle,
    };
    vec![
        Element::Quadrupole {
            length: params.quad_length,
            k: params.k,
        },
        drift.clone(),
        bend.clone(),
        drift.clone(),
        Element::Quadrupole {
            length: params.quad_length,
            k: -params.k,
        },
        drift.clone(),
        bend,
        drift,
    ]
}

/// Closed ring of identical FODO cells without RF.
pub fn fodo_ring(params: &FodoParams) -> Result<Ring, OpticsError> {
    let cell = fodo_cell(params);
    let elements = (0..params.cells).flat_map(|_| cell.iter().cloned()).collect();
    Ring::new(elements, params.energy)
}

/// FODO ring with a thin skew quadrupole of strength `ks` after the first cell.
pub fn coupled_fodo_ring(params: &FodoParams, ks: f64) -> Result<Ring, OpticsError> {
    let mut ring = fodo_ring(params)?;
    let position = fodo_cell(params).len().min(ring.elements.len());
    ring.elements.insert(position, Element::SkewQuad { ks });
    ring.validate()?;
    Ok(ring)
}

/// FODO ring closed by an RF cavity and a lumped radiator, radiation on.
///
/// The cavity runs at `harmonic` times the revolution frequency.
pub fn rf_fodo_ring(
    params: &FodoParams,
    voltage: f64,
    harmonic: f64,
    energy_loss: f64,
) -> Result<Ring, OpticsError> {
    let mut ring = fodo_ring(params)?;
    let frequency = harmonic * SPEED_OF_LIGHT / ring.length();
    ring.elements.push(Element::RfCavity {
        length: 0.0,
        voltage,
        frequency,
        harmonic,
    });
    ring.elements.push(Element::Radiator { energy_loss });
    ring.validate()?;
    Ok(ring.radiation_on())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ring_closes_the_circle() {
        let ring = fodo_ring(&FodoParams::default()).unwrap();
        let total: f64 = ring
            .elements
            .iter()
            .filter_map(|element| match element {
                Element::Dipole { angle, .. } => Some(*angle),
                _ => None,
            })
            .sum();
        assert!((total - TAU).abs() < 1e-12);
        assert!((ring.length() - 89.6).abs() < 1e-9);
    }

    #[test]
    fn rf_ring_is_radiating() {
        let ring = rf_fodo_ring(&FodoParams::default(), 1e6, 100.0, 5e3).unwrap();
        assert!(ring.radiation);
        assert!(ring.rf_path_offset().unwrap().abs() < 1e-9);
    }
}
