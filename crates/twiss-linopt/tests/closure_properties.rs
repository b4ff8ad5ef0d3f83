use std::f64::consts::TAU;

use nalgebra::Matrix2;
use proptest::prelude::*;
use twiss_linopt::closure::{closure, tune, tune_difference};
use twiss_linopt::propagate::unwrap_phase;

fn twiss_block(alpha: f64, beta: f64, tune: f64) -> Matrix2<f64> {
    let gamma = (1.0 + alpha * alpha) / beta;
    let (s, c) = (TAU * tune).sin_cos();
    Matrix2::new(c + alpha * s, beta * s, -gamma * s, c - alpha * s)
}

proptest! {
    #[test]
    fn closure_recovers_twiss(alpha in -3.0f64..3.0, beta in 0.2f64..50.0, q in 0.01f64..0.99) {
        let block = twiss_block(alpha, beta, q);
        let closed = closure(&block).unwrap();
        prop_assert!((closed.alpha - alpha).abs() < 1e-9 * (1.0 + alpha.abs()));
        prop_assert!((closed.beta - beta).abs() < 1e-9 * beta);
        prop_assert!((tune(&closed.eigenvalue) - q).abs() < 1e-9);
    }

    #[test]
    fn unwrapped_phase_is_monotone(steps in prop::collection::vec(0.0f64..3.0, 1..64)) {
        let mut total = 0.0;
        let raw: Vec<f64> = steps
            .iter()
            .map(|step| {
                total += step;
                (total + std::f64::consts::PI).rem_euclid(TAU) - std::f64::consts::PI
            })
            .collect();
        let unwrapped = unwrap_phase(&raw);
        let mut expected = 0.0;
        for (mu, step) in unwrapped.iter().zip(&steps) {
            expected += step;
            prop_assert!((mu - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn tune_difference_stays_folded(a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let d = tune_difference(a, b);
        prop_assert!((-0.5..0.5).contains(&d));
        prop_assert!(((a - b - d).round() - (a - b - d)).abs() < 1e-12);
    }
}
