use twiss_core::{ErrorInfo, Mode, MomentumCompaction, OpticsError, Tolerances};

use crate::orbit::find_orbit4;
use crate::ring::Ring;

/// Momentum compaction factor `d(ct)/d(delta) / L` from the transverse closed
/// orbits at `+-dp_step/2`, radiation switched off.
pub fn momentum_compaction(ring: &Ring, tolerances: &Tolerances) -> Result<f64, OpticsError> {
    let ring = ring.radiation_off();
    let length = ring.length();
    if !(length > 0.0) {
        return Err(OpticsError::Lattice(
            ErrorInfo::new("mcf-length", "momentum compaction needs a positive ring length")
                .with_context("length", length),
        ));
    }
    let dp = tolerances.dp_step;
    let below = find_orbit4(&ring, -0.5 * dp, None, tolerances)?;
    let above = find_orbit4(&ring, 0.5 * dp, None, tolerances)?;
    let ct_below = ring.track(&below, Mode::Mode4D)[5] - below[5];
    let ct_above = ring.track(&above, Mode::Mode4D)[5] - above[5];
    let mcf = (ct_above - ct_below) / dp / length;
    tracing::debug!(mcf, dp, "momentum compaction");
    Ok(mcf)
}

impl MomentumCompaction for Ring {
    fn momentum_compaction(&self, tolerances: &Tolerances) -> Result<f64, OpticsError> {
        momentum_compaction(self, tolerances)
    }
}
