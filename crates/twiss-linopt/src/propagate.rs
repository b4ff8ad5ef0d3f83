//! Twiss propagation along cumulative transfer matrices.

use std::f64::consts::TAU;

use nalgebra::Matrix2;

/// Phase drops larger than this are taken as a wrap of `atan2`.
pub const UNWRAP_THRESHOLD: f64 = -1.0e-3;

/// Alpha, beta and raw phase after the 2x2 transport `ms`, starting from
/// `(alpha0, beta0)`. The phase is in `(-pi, pi]`.
pub fn slice_twiss(ms: &Matrix2<f64>, alpha0: f64, beta0: f64) -> (f64, f64, f64) {
    let b = ms[(0, 1)];
    let a = ms[(0, 0)] * beta0 - b * alpha0;
    let beta = (a * a + b * b) / beta0;
    let alpha = -(a * (ms[(1, 0)] * beta0 - ms[(1, 1)] * alpha0) + b * ms[(1, 1)]) / beta0;
    (alpha, beta, b.atan2(a))
}

/// Removes `atan2` wraps from an ordered phase sequence.
///
/// The first phase is compared to zero; each drop below [`UNWRAP_THRESHOLD`]
/// adds one turn to that point and every later one.
pub fn unwrap_phase(raw: &[f64]) -> Vec<f64> {
    raw.iter()
        .scan((0.0_f64, 0.0_f64), |(previous, turns), &mu| {
            if mu - *previous < UNWRAP_THRESHOLD {
                *turns += TAU;
            }
            *previous = mu;
            Some(mu + *turns)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_twiss() {
        let (alpha, beta, mu) = slice_twiss(&Matrix2::identity(), 0.4, 3.0);
        assert!((alpha - 0.4).abs() < 1e-15);
        assert!((beta - 3.0).abs() < 1e-15);
        assert_eq!(mu, 0.0);
    }

    #[test]
    fn drift_grows_beta_quadratically() {
        let drift = Matrix2::new(1.0, 2.0, 0.0, 1.0);
        let (alpha, beta, _) = slice_twiss(&drift, 0.0, 1.0);
        assert!((beta - 5.0).abs() < 1e-14);
        assert!((alpha + 2.0).abs() < 1e-14);
    }

    #[test]
    fn wraps_are_accumulated() {
        let raw = [0.5, 3.0, -3.0, -1.0, 2.5, -2.9];
        let unwrapped = unwrap_phase(&raw);
        assert!((unwrapped[2] - (-3.0 + TAU)).abs() < 1e-12);
        assert!((unwrapped[5] - (-2.9 + 2.0 * TAU)).abs() < 1e-12);
    }

    #[test]
    fn negative_first_phase_is_wrapped() {
        let unwrapped = unwrap_phase(&[-0.5]);
        assert!((unwrapped[0] - (TAU - 0.5)).abs() < 1e-12);
    }
}
