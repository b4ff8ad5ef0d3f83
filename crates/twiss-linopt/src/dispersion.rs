//! Dispersion from closed orbits at two nearby momenta.

use twiss_core::{
    ErrorInfo, Mode, OpticsError, OpticsModel, Orbit, OrbitFinder, OrbitRequest, Tolerances,
};

/// Entrance and reference-point orbits at the upper and lower momentum.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitPair {
    /// Entrance orbit at the upper momentum.
    pub up: Orbit,
    /// Entrance orbit at the lower momentum.
    pub down: Orbit,
    /// Reference-point orbits at the upper momentum.
    pub up_points: Vec<Orbit>,
    /// Reference-point orbits at the lower momentum.
    pub down_points: Vec<Orbit>,
}

fn difference(up: &Orbit, down: &Orbit, delta: f64) -> [f64; 4] {
    [0, 1, 2, 3].map(|i| (up[i] - down[i]) / delta)
}

impl OrbitPair {
    /// Momentum difference between the two entrance orbits.
    pub fn delta(&self) -> f64 {
        self.up[4] - self.down[4]
    }

    /// Dispersion at the entrance.
    pub fn start(&self) -> [f64; 4] {
        difference(&self.up, &self.down, self.delta())
    }

    /// Dispersion at each reference point.
    pub fn points(&self) -> Vec<[f64; 4]> {
        let delta = self.delta();
        self.up_points
            .iter()
            .zip(&self.down_points)
            .map(|(up, down)| difference(up, down, delta))
            .collect()
    }

    fn check(self) -> Result<Self, OpticsError> {
        if self.delta() == 0.0 {
            return Err(OpticsError::Lattice(
                ErrorInfo::new("dispersion-degenerate", "off-momentum orbits share one momentum")
                    .with_hint("check the momentum compaction and the RF frequency"),
            ));
        }
        Ok(self)
    }
}

fn request<'a>(
    mode: Mode,
    dp: f64,
    guess: Option<Orbit>,
    orbit: Option<Orbit>,
    tolerances: &'a Tolerances,
) -> OrbitRequest<'a> {
    OrbitRequest {
        mode,
        dp,
        guess,
        orbit,
        tolerances,
        keep_lattice: true,
    }
}

/// Closed orbits of a periodic lattice at `orbit0[4] +- dp_step / 2`.
pub fn momentum_pair<L: OrbitFinder>(
    lattice: &L,
    refpts: &[usize],
    orbit0: &Orbit,
    tolerances: &Tolerances,
) -> Result<OrbitPair, OpticsError> {
    let half = 0.5 * tolerances.dp_step;
    let (up, up_points) = lattice.find_orbit(
        refpts,
        &request(Mode::Mode4D, orbit0[4] + half, Some(*orbit0), None, tolerances),
    )?;
    let (down, down_points) = lattice.find_orbit(
        refpts,
        &request(Mode::Mode4D, orbit0[4] - half, Some(*orbit0), None, tolerances),
    )?;
    OrbitPair {
        up,
        down,
        up_points,
        down_points,
    }
    .check()
}

/// Orbits of an open line launched at `orbit0 +- (dp_step / 2) (D0, 1, 0)`.
pub fn line_pair<L: OrbitFinder>(
    lattice: &L,
    refpts: &[usize],
    orbit0: &Orbit,
    dispersion0: &[f64; 4],
    tolerances: &Tolerances,
) -> Result<OrbitPair, OpticsError> {
    let half = 0.5 * tolerances.dp_step;
    let shift: Orbit = std::array::from_fn(|i| match i {
        0..=3 => half * dispersion0[i],
        4 => half,
        _ => 0.0,
    });
    let launch_up: Orbit = std::array::from_fn(|i| orbit0[i] + shift[i]);
    let launch_down: Orbit = std::array::from_fn(|i| orbit0[i] - shift[i]);
    let (up, up_points) = lattice.find_orbit(
        refpts,
        &request(Mode::Mode4D, launch_up[4], None, Some(launch_up), tolerances),
    )?;
    let (down, down_points) = lattice.find_orbit(
        refpts,
        &request(Mode::Mode4D, launch_down[4], None, Some(launch_down), tolerances),
    )?;
    OrbitPair {
        up,
        down,
        up_points,
        down_points,
    }
    .check()
}

/// Copies of a radiating lattice with the RF frequency moved by `+-df / 2`
/// where `df = -dp_step * eta * f_rf`, and their 6D closed orbits.
#[derive(Debug, Clone)]
pub struct RfShifted<L> {
    /// Lattice at the higher momentum.
    pub up: L,
    /// Lattice at the lower momentum.
    pub down: L,
    /// Closed orbits of `up` and `down`.
    pub orbits: OrbitPair,
}

/// Builds the RF-shifted copies of `lattice` and finds their closed orbits.
pub fn rf_shifted<L: OpticsModel>(
    lattice: &L,
    refpts: &[usize],
    orbit0: &Orbit,
    tolerances: &Tolerances,
) -> Result<RfShifted<L>, OpticsError> {
    let frequency = lattice.rf_frequency()?;
    let eta = lattice.momentum_compaction(tolerances)?;
    let df = -tolerances.dp_step * eta * frequency;
    tracing::debug!(frequency, eta, df, "RF frequency shift for off-momentum optics");
    let up = lattice.with_rf_frequency(frequency + 0.5 * df)?;
    let down = lattice.with_rf_frequency(frequency - 0.5 * df)?;
    let (orbit_up, up_points) = up.find_orbit(
        refpts,
        &request(Mode::Mode6D, 0.0, Some(*orbit0), None, tolerances),
    )?;
    let (orbit_down, down_points) = down.find_orbit(
        refpts,
        &request(Mode::Mode6D, 0.0, Some(*orbit0), None, tolerances),
    )?;
    let orbits = OrbitPair {
        up: orbit_up,
        down: orbit_down,
        up_points,
        down_points,
    }
    .check()?;
    Ok(RfShifted { up, down, orbits })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispersion_divides_by_entrance_momentum_difference() {
        let pair = OrbitPair {
            up: [2e-6, 1e-6, 0.0, 0.0, 1e-6, 0.0],
            down: [-2e-6, -1e-6, 0.0, 0.0, -1e-6, 0.0],
            up_points: vec![[1e-6, 0.0, 0.0, 0.0, 1.1e-6, 0.0]],
            down_points: vec![[-1e-6, 0.0, 0.0, 0.0, -0.9e-6, 0.0]],
        };
        assert!((pair.start()[0] - 2.0).abs() < 1e-9);
        assert!((pair.points()[0][0] - 1.0).abs() < 1e-9);
    }
}
