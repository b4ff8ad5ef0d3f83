//! Optics averaged over the length of each selected segment.

use serde::{Deserialize, Serialize};
use twiss_core::{ErrorInfo, OpticsError, OpticsModel, RefPts, SegmentInfo};

use crate::config::LinoptOpts;
use crate::linopt::{linopt, require_radiation_off};
use crate::record::{LinearOptics, OpticsRecord};

/// Averaged optics at each selected segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedOptics {
    /// Linear optics at the segment entrances, tunes and chromaticity included.
    pub optics: LinearOptics,
    /// Mean beta per transverse mode.
    pub beta: Vec<[f64; 2]>,
    /// Mean phase per mode.
    pub mu: Vec<Vec<f64>>,
    /// Mean `(Dx, Dx', Dy, Dy')`.
    pub dispersion: Vec<[f64; 4]>,
    /// Mean path position.
    pub s: Vec<f64>,
}

fn beta_drift(entry: &OpticsRecord, exit: &OpticsRecord, length: f64) -> [f64; 2] {
    [0, 1].map(|k| {
        let (alpha0, beta0) = (entry.alpha[k], entry.beta[k]);
        let gamma0 = (1.0 + alpha0 * alpha0) / beta0;
        0.5 * (beta0 + exit.beta[k]) - gamma0 * length * length / 6.0
    })
}

fn beta_focusing(entry: &OpticsRecord, exit: &OpticsRecord, strength: [f64; 2], length: f64) -> [f64; 2] {
    [0, 1].map(|k| {
        let (alpha1, beta1) = (exit.alpha[k], exit.beta[k]);
        let gamma1 = (1.0 + alpha1 * alpha1) / beta1;
        0.5 * ((gamma1 + strength[k] * beta1) * length + alpha1 - entry.alpha[k])
            / (strength[k] * length)
    })
}

fn averaged_dispersion(
    entry: &OpticsRecord,
    exit: &OpticsRecord,
    strength: Option<[f64; 2]>,
    length: f64,
) -> [f64; 4] {
    let (d0, d1) = (&entry.dispersion, &exit.dispersion);
    let mut mean = [0.0; 4];
    for plane in 0..2 {
        let (pos, slope) = (2 * plane, 2 * plane + 1);
        mean[pos] = match strength {
            Some(k) => (d0[slope] - d1[slope]) / (k[plane] * length),
            None => 0.5 * (d0[pos] + d1[pos]),
        };
        mean[slope] = (d1[pos] - d0[pos]) / length;
    }
    mean
}

/// Linear optics with beta, phase, dispersion and s averaged over each
/// selected segment.
///
/// Drifts and dipoles use the drift formula; segments with a non-zero
/// gradient use the closed form for a thick quadrupole. Thin segments and the
/// lattice end keep their entrance values.
pub fn avlinopt<L: OpticsModel>(
    lattice: &L,
    refpts: &RefPts,
    opts: &LinoptOpts,
) -> Result<AveragedOptics, OpticsError> {
    require_radiation_off(lattice, "averaged optics")?;
    let segments = lattice.segment_count();
    let selected = refpts.resolve(segments)?;
    let infos = selected
        .iter()
        .map(|&index| {
            if index < segments {
                lattice.segment(index).map(Some)
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    let thick = |info: &Option<SegmentInfo>| info.is_some_and(|i| i.length != 0.0);

    let mut all: Vec<usize> = selected.clone();
    all.extend(
        selected
            .iter()
            .zip(&infos)
            .filter(|(_, info)| thick(*info))
            .map(|(&index, _)| index + 1),
    );
    all.sort_unstable();
    all.dedup();
    tracing::debug!(selected = selected.len(), evaluated = all.len(), "averaged optics");

    let opts = LinoptOpts {
        get_chrom: true,
        ..opts.clone()
    };
    let full = linopt(lattice, &RefPts::Indices(all), &opts)?;
    let record = |index: usize| {
        full.point(index).ok_or_else(|| {
            OpticsError::DimensionMismatch(
                ErrorInfo::new("average-point", "missing optics record").with_context("index", index),
            )
        })
    };

    let mut averaged = AveragedOptics {
        optics: LinearOptics {
            points: Vec::with_capacity(selected.len()),
            ..full.clone()
        },
        beta: Vec::with_capacity(selected.len()),
        mu: Vec::with_capacity(selected.len()),
        dispersion: Vec::with_capacity(selected.len()),
        s: Vec::with_capacity(selected.len()),
    };
    for (&index, info) in selected.iter().zip(&infos) {
        let entry = record(index)?;
        averaged.optics.points.push(entry.clone());
        match info.filter(|i| i.length != 0.0) {
            Some(info) => {
                let exit = record(index + 1)?;
                let length = info.length;
                let strength = (info.strength != 0.0).then_some([info.strength, -info.strength]);
                averaged.beta.push(match strength {
                    Some(k) => beta_focusing(entry, exit, k, length),
                    None => beta_drift(entry, exit, length),
                });
                averaged.mu.push(
                    entry
                        .mu
                        .iter()
                        .zip(&exit.mu)
                        .map(|(m0, m1)| 0.5 * (m0 + m1))
                        .collect(),
                );
                averaged
                    .dispersion
                    .push(averaged_dispersion(entry, exit, strength, length));
                averaged.s.push(0.5 * (entry.s + exit.s));
            }
            None => {
                averaged.beta.push(entry.beta);
                averaged.mu.push(entry.mu.clone());
                averaged.dispersion.push(entry.dispersion);
                averaged.s.push(entry.s);
            }
        }
    }
    Ok(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn record(alpha: f64, beta: f64, dispersion: [f64; 4]) -> OpticsRecord {
        OpticsRecord {
            index: 0,
            s: 0.0,
            alpha: [alpha; 2],
            beta: [beta; 2],
            mu: vec![0.0; 2],
            gamma: None,
            a: None,
            b: None,
            c: None,
            closed_orbit: [0.0; 6],
            dispersion,
            matrix: DMatrix::identity(4, 4),
            w: None,
        }
    }

    #[test]
    fn drift_average_integrates_the_parabola() {
        // beta(s) = beta0 - 2 alpha0 s + gamma0 s^2 with alpha0 = 0, beta0 = 2, L = 3
        let entry = record(0.0, 2.0, [0.0; 4]);
        let exit = record(-1.5, 2.0 + 9.0 / 2.0, [0.0; 4]);
        let mean = beta_drift(&entry, &exit, 3.0);
        // (1 / L) integral = beta0 + gamma0 L^2 / 3
        assert!((mean[0] - (2.0 + 0.5 * 9.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn drift_dispersion_is_linear_mean() {
        let entry = record(0.0, 1.0, [1.0, 0.1, 0.0, 0.0]);
        let exit = record(0.0, 1.0, [1.2, 0.1, 0.0, 0.0]);
        let mean = averaged_dispersion(&entry, &exit, None, 2.0);
        assert!((mean[0] - 1.1).abs() < 1e-12);
        assert!((mean[1] - 0.1).abs() < 1e-12);
    }
}
