use nalgebra::DMatrix;
use twiss_core::{Mode, OpticsError, Orbit, Tolerances, TransferMatrixProvider};

use crate::ring::Ring;

/// One-turn and cumulative matrices by symmetric differences around `orbit`.
fn differentiate(
    ring: &Ring,
    orbit: &Orbit,
    refpts: &[usize],
    mode: Mode,
    step: f64,
) -> (DMatrix<f64>, Vec<DMatrix<f64>>) {
    let dim = mode.dimension();
    let mut one_turn = DMatrix::<f64>::zeros(dim, dim);
    let mut cumulative = vec![DMatrix::<f64>::zeros(dim, dim); refpts.len()];
    for j in 0..dim {
        let mut plus = *orbit;
        let mut minus = *orbit;
        plus[j] += 0.5 * step;
        minus[j] -= 0.5 * step;
        let (end_plus, at_plus) = ring.track_refpts(&plus, refpts, mode);
        let (end_minus, at_minus) = ring.track_refpts(&minus, refpts, mode);
        for i in 0..dim {
            one_turn[(i, j)] = (end_plus[i] - end_minus[i]) / step;
        }
        for (matrix, (p, m)) in cumulative.iter_mut().zip(at_plus.iter().zip(&at_minus)) {
            for i in 0..dim {
                matrix[(i, j)] = (p[i] - m[i]) / step;
            }
        }
    }
    (one_turn, cumulative)
}

/// 4x4 transverse matrices at the momentum deviation carried by `orbit`.
pub fn find_m44(
    ring: &Ring,
    orbit: &Orbit,
    refpts: &[usize],
    tolerances: &Tolerances,
) -> Result<(DMatrix<f64>, Vec<DMatrix<f64>>), OpticsError> {
    ring.check_refpts(refpts)?;
    Ok(differentiate(ring, orbit, refpts, Mode::Mode4D, tolerances.xy_step))
}

/// 6x6 matrices with cavities and radiation active.
pub fn find_m66(
    ring: &Ring,
    orbit: &Orbit,
    refpts: &[usize],
    tolerances: &Tolerances,
) -> Result<(DMatrix<f64>, Vec<DMatrix<f64>>), OpticsError> {
    ring.check_refpts(refpts)?;
    Ok(differentiate(ring, orbit, refpts, Mode::Mode6D, tolerances.xy_step))
}

impl TransferMatrixProvider for Ring {
    // Element maps carry no cached state, so `keep_lattice` has nothing to reuse.
    fn transfer_matrices(
        &self,
        refpts: &[usize],
        mode: Mode,
        orbit: &Orbit,
        tolerances: &Tolerances,
        _keep_lattice: bool,
    ) -> Result<(DMatrix<f64>, Vec<DMatrix<f64>>), OpticsError> {
        match mode {
            Mode::Mode4D => find_m44(self, orbit, refpts, tolerances),
            Mode::Mode6D => find_m66(self, orbit, refpts, tolerances),
        }
    }
}
