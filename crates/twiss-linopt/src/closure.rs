use std::f64::consts::TAU;

use nalgebra::{Complex, ComplexField, Matrix2};
use twiss_core::{ErrorInfo, OpticsError};

use crate::blocks::sign;

/// Twiss parameters and eigenvalue of a stable 2x2 one-period block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closure {
    /// Alpha at the block entrance.
    pub alpha: f64,
    /// Beta at the block entrance.
    pub beta: f64,
    /// `cos(mu) + i sin(mu)`.
    pub eigenvalue: Complex<f64>,
}

/// Extracts alpha, beta and the eigenvalue of a 2x2 block.
///
/// Fails with [`OpticsError::UnstableOptics`] when `|trace| >= 2`.
pub fn closure(block: &Matrix2<f64>) -> Result<Closure, OpticsError> {
    let diff = 0.5 * (block[(0, 0)] - block[(1, 1)]);
    let radicand = -block[(0, 1)] * block[(1, 0)] - diff * diff;
    if !(radicand > 0.0) {
        return Err(OpticsError::UnstableOptics(
            ErrorInfo::new("closure-unstable", "2x2 block has no stable closure")
                .with_context("trace", block.trace())
                .with_context("radicand", radicand),
        ));
    }
    let sinmu = sign(block[(0, 1)]) * radicand.sqrt();
    let cosmu = 0.5 * block.trace();
    Ok(Closure {
        alpha: diff / sinmu,
        beta: block[(0, 1)] / sinmu,
        eigenvalue: Complex::new(cosmu, sinmu),
    })
}

/// Phase of `eigenvalue` in `[0, 2 pi)`.
pub fn phase(eigenvalue: &Complex<f64>) -> f64 {
    let mu = eigenvalue.argument().rem_euclid(TAU);
    if mu >= TAU {
        0.0
    } else {
        mu
    }
}

/// Fractional tune of `eigenvalue` in `[0, 1)`.
pub fn tune(eigenvalue: &Complex<f64>) -> f64 {
    phase(eigenvalue) / TAU
}

/// Difference of two fractional tunes folded into `[-0.5, 0.5)`.
pub fn tune_difference(up: f64, down: f64) -> f64 {
    (up - down + 0.5).rem_euclid(1.0) - 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twiss_block(alpha: f64, beta: f64, mu: f64) -> Matrix2<f64> {
        let gamma = (1.0 + alpha * alpha) / beta;
        let (s, c) = mu.sin_cos();
        Matrix2::new(c + alpha * s, beta * s, -gamma * s, c - alpha * s)
    }

    #[test]
    fn recovers_twiss_of_a_known_block() {
        let result = closure(&twiss_block(-0.5, 8.0, TAU * 0.31)).unwrap();
        assert!((result.alpha + 0.5).abs() < 1e-12);
        assert!((result.beta - 8.0).abs() < 1e-12);
        assert!((tune(&result.eigenvalue) - 0.31).abs() < 1e-12);
    }

    #[test]
    fn phase_above_pi_keeps_positive_beta() {
        let result = closure(&twiss_block(0.3, 2.0, TAU * 0.8)).unwrap();
        assert!((result.beta - 2.0).abs() < 1e-12);
        assert!((tune(&result.eigenvalue) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn hyperbolic_block_is_unstable() {
        let err = closure(&Matrix2::new(2.0, 1.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, OpticsError::UnstableOptics(_)));
        assert_eq!(err.info().code, "closure-unstable");
    }

    #[test]
    fn tune_difference_folds_across_integer() {
        assert!((tune_difference(0.001, 0.999) - 0.002).abs() < 1e-12);
        assert!((tune_difference(0.3, 0.2) - 0.1).abs() < 1e-12);
    }
}
