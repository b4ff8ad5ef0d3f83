use twiss_core::{Mode, OpticsError, Orbit, Tolerances, TransferMatrixProvider};

use crate::closure::{tune, tune_difference};
use crate::decompose::{analyze, Analysis, ModalOptics, ModalPoint};

/// Chromaticity and W functions from two off-momentum analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromatic {
    /// Transverse chromaticity.
    pub chromaticity: [f64; 2],
    /// W at the entrance.
    pub w_start: [f64; 2],
    /// W at each reference point.
    pub w_points: Vec<[f64; 2]>,
}

/// Chromatic amplitude function from Twiss pairs at momenta `delta` apart.
pub fn w_function(
    delta: f64,
    alpha_up: f64,
    beta_up: f64,
    alpha_down: f64,
    beta_down: f64,
) -> f64 {
    let db = (beta_up - beta_down) / delta;
    let mb = 0.5 * (beta_up + beta_down);
    let da = (alpha_up - alpha_down) / delta;
    let ma = 0.5 * (alpha_up + alpha_down);
    ((da - ma / mb * db).powi(2) + (db / mb).powi(2)).sqrt()
}

fn w_pair(delta: f64, up: &ModalPoint, down: &ModalPoint) -> [f64; 2] {
    [0, 1].map(|k| w_function(delta, up.alpha[k], up.beta[k], down.alpha[k], down.beta[k]))
}

/// Analysis of `lattice` closed around `orbit`.
///
/// Open lines are closed on their own off-momentum map here, so their tunes
/// and chromaticity describe the line as one period.
pub fn off_momentum<L: TransferMatrixProvider>(
    lattice: &L,
    refpts: &[usize],
    mode: Mode,
    orbit: &Orbit,
    analysis: Analysis,
    tolerances: &Tolerances,
) -> Result<ModalOptics, OpticsError> {
    let (one_turn, matrices) = lattice.transfer_matrices(refpts, mode, orbit, tolerances, true)?;
    analyze(analysis, &one_turn, &matrices)
}

/// Combines the upper and lower analyses.
pub fn chromatic(up: &ModalOptics, down: &ModalOptics, delta: f64) -> Chromatic {
    let chromaticity = [0, 1].map(|k| {
        tune_difference(tune(&up.eigenvalues[k]), tune(&down.eigenvalues[k])) / delta
    });
    tracing::debug!(?chromaticity, delta, "chromaticity");
    Chromatic {
        chromaticity,
        w_start: w_pair(delta, &up.start, &down.start),
        w_points: up
            .points
            .iter()
            .zip(&down.points)
            .map(|(u, d)| w_pair(delta, u, d))
            .collect(),
    }
}
