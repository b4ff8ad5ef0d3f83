use nalgebra::{DMatrix, DVector};
use twiss_core::{ErrorInfo, Mode, OpticsError, Orbit, OrbitFinder, OrbitRequest, Tolerances};

use crate::ring::Ring;

/// Closed orbit at fixed momentum deviation `dp`, searched over the four
/// transverse coordinates.
pub fn find_orbit4(
    ring: &Ring,
    dp: f64,
    guess: Option<&Orbit>,
    tolerances: &Tolerances,
) -> Result<Orbit, OpticsError> {
    let mut start = guess.copied().unwrap_or([0.0; 6]);
    start[4] = dp;
    start[5] = 0.0;
    newton(ring, start, Mode::Mode4D, &[0.0; 6], tolerances)
}

/// Full 6D closed orbit; the path-length condition comes from the RF frequency.
pub fn find_orbit6(
    ring: &Ring,
    guess: Option<&Orbit>,
    tolerances: &Tolerances,
) -> Result<Orbit, OpticsError> {
    let mut target = [0.0; 6];
    target[5] = ring.rf_path_offset()?;
    let start = guess.copied().unwrap_or([0.0; 6]);
    newton(ring, start, Mode::Mode6D, &target, tolerances)
}

fn residual(ring: &Ring, x: &Orbit, mode: Mode, target: &Orbit) -> DVector<f64> {
    let out = ring.track(x, mode);
    DVector::from_iterator(
        mode.dimension(),
        (0..mode.dimension()).map(|i| out[i] - x[i] - target[i]),
    )
}

fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, value| acc.max(value.abs()))
}

fn newton(
    ring: &Ring,
    start: Orbit,
    mode: Mode,
    target: &Orbit,
    tolerances: &Tolerances,
) -> Result<Orbit, OpticsError> {
    let dim = mode.dimension();
    let step = tolerances.xy_step;
    let mut x = start;
    let mut last = f64::INFINITY;
    for iteration in 0..tolerances.max_iterations {
        let f = residual(ring, &x, mode, target);
        let norm = max_abs(&f);
        tracing::trace!(iteration, residual = norm, ?mode, "closed orbit step");
        if norm <= tolerances.orbit_tolerance {
            return Ok(x);
        }
        let mut jacobian = DMatrix::<f64>::zeros(dim, dim);
        for j in 0..dim {
            let mut plus = x;
            let mut minus = x;
            plus[j] += 0.5 * step;
            minus[j] -= 0.5 * step;
            let column =
                (residual(ring, &plus, mode, target) - residual(ring, &minus, mode, target)) / step;
            jacobian.set_column(j, &column);
        }
        let correction = jacobian.lu().solve(&(-&f)).ok_or_else(|| {
            OpticsError::Convergence(
                ErrorInfo::new("orbit-singular", "closed-orbit Jacobian is singular")
                    .with_context("iteration", iteration)
                    .with_hint("the one-turn map has an eigenvalue at 1"),
            )
        })?;
        for (i, delta) in correction.iter().enumerate() {
            x[i] += delta;
        }
        last = max_abs(&correction);
        if last <= tolerances.orbit_tolerance {
            return Ok(x);
        }
    }
    Err(OpticsError::Convergence(
        ErrorInfo::new("orbit-no-convergence", "closed-orbit search did not converge")
            .with_context("iterations", tolerances.max_iterations)
            .with_context("last_step", last),
    ))
}

impl OrbitFinder for Ring {
    fn find_orbit(
        &self,
        refpts: &[usize],
        request: &OrbitRequest<'_>,
    ) -> Result<(Orbit, Vec<Orbit>), OpticsError> {
        self.check_refpts(refpts)?;
        let orbit0 = match (request.orbit, request.mode) {
            (Some(orbit), _) => orbit,
            (None, Mode::Mode4D) => {
                find_orbit4(self, request.dp, request.guess.as_ref(), request.tolerances)?
            }
            (None, Mode::Mode6D) => find_orbit6(self, request.guess.as_ref(), request.tolerances)?,
        };
        let (_, orbits) = self.track_refpts(&orbit0, refpts, request.mode);
        Ok((orbit0, orbits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{fodo_ring, FodoParams};

    #[test]
    fn on_momentum_orbit_of_a_linear_ring_is_zero() {
        let ring = fodo_ring(&FodoParams::default()).unwrap();
        let orbit = find_orbit4(&ring, 0.0, None, &Tolerances::default()).unwrap();
        assert!(orbit.iter().all(|value| value.abs() < 1e-15));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let ring = fodo_ring(&FodoParams::default()).unwrap();
        let tolerances = Tolerances {
            max_iterations: 0,
            ..Tolerances::default()
        };
        let err = find_orbit4(&ring, 1e-3, None, &tolerances).unwrap_err();
        assert!(matches!(err, OpticsError::Convergence(_)));
        assert_eq!(err.info().code, "orbit-no-convergence");
    }
}
