//! Three-mode analysis of 6x6 one-turn maps.
//!
//! Each plane is an ordered (position, momentum) coordinate pair. The
//! longitudinal plane is read as `(ct, delta)` so that every stable mode
//! advances its phase in the positive sense.

use nalgebra::{Complex, ComplexField, DMatrix, DVector};
use twiss_core::{ErrorInfo, OpticsError};

use crate::blocks::check_square;
use crate::closure::phase;
use crate::decompose::{ModalOptics, ModalPoint};
use crate::propagate::unwrap_phase;

const PLANES: [(usize, usize); 3] = [(0, 1), (2, 3), (5, 4)];

/// Orientation of each plane relative to the `(x, px, y, py, delta, ct)` symplectic form.
const ORIENTATION: [f64; 3] = [1.0, 1.0, -1.0];

/// Normalised eigenvector and eigenvalue of one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenmode {
    /// One-turn eigenvalue.
    pub eigenvalue: Complex<f64>,
    /// Eigenvector, real and positive in the plane's position coordinate.
    pub vector: DVector<Complex<f64>>,
}

fn plane_weight(v: &DVector<Complex<f64>>, plane: usize) -> f64 {
    let (p, q) = PLANES[plane];
    (v[p].conj() * v[q]).im
}

fn symplectic_norm(v: &DVector<Complex<f64>>) -> f64 {
    (0..3).map(|plane| ORIENTATION[plane] * plane_weight(v, plane)).sum()
}

/// Right null vector of `mt - lambda I`.
fn null_vector(
    mt: &DMatrix<f64>,
    lambda: Complex<f64>,
) -> Result<DVector<Complex<f64>>, OpticsError> {
    let n = mt.nrows();
    let shifted = DMatrix::from_fn(n, n, |i, j| {
        let value = Complex::new(mt[(i, j)], 0.0);
        if i == j {
            value - lambda
        } else {
            value
        }
    });
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        OpticsError::unstable("eigenvector-failed", "singular value decomposition failed")
    })?;
    let row = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(row, _)| row)
        .ok_or_else(|| OpticsError::unstable("eigenvector-failed", "empty singular value set"))?;
    Ok(DVector::from_fn(n, |j, _| v_t[(row, j)].conj()))
}

/// Eigenmodes of a 6x6 one-turn matrix, ordered x, y, z.
pub fn eigenmodes(mt: &DMatrix<f64>) -> Result<[Eigenmode; 3], OpticsError> {
    check_square(mt, 6, "one-turn matrix")?;
    let eigenvalues: Vec<Complex<f64>> = mt.complex_eigenvalues().iter().copied().collect();
    let vectors = eigenvalues
        .iter()
        .map(|&lambda| null_vector(mt, lambda))
        .collect::<Result<Vec<_>, _>>()?;
    let scores: Vec<[f64; 3]> = vectors
        .iter()
        .map(|v| {
            let size = v.norm_squared();
            [0, 1, 2].map(|plane| plane_weight(v, plane) / size)
        })
        .collect();

    let mut used = vec![false; eigenvalues.len()];
    let mut chosen: [Option<usize>; 3] = [None; 3];
    for _ in 0..3 {
        let mut best: Option<(usize, usize, f64)> = None;
        for (index, score) in scores.iter().enumerate().filter(|(index, _)| !used[*index]) {
            for plane in (0..3).filter(|&plane| chosen[plane].is_none()) {
                if score[plane] > best.map_or(0.0, |(_, _, s)| s) {
                    best = Some((index, plane, score[plane]));
                }
            }
        }
        let (index, plane, _) = best.ok_or_else(|| {
            OpticsError::unstable("mode-unassigned", "a plane has no stable oscillation mode")
        })?;
        chosen[plane] = Some(index);
        used[index] = true;
        let partner = eigenvalues
            .iter()
            .enumerate()
            .filter(|(other, _)| !used[*other])
            .min_by(|a, b| {
                let da = (a.1 - eigenvalues[index].conj()).modulus();
                let db = (b.1 - eigenvalues[index].conj()).modulus();
                da.total_cmp(&db)
            })
            .map(|(other, _)| other);
        if let Some(partner) = partner {
            used[partner] = true;
        }
    }

    let mut modes = Vec::with_capacity(3);
    for (plane, index) in chosen.iter().enumerate() {
        let index = index
            .ok_or_else(|| OpticsError::unstable("mode-unassigned", "mode assignment incomplete"))?;
        let mut vector = vectors[index].clone();
        let norm = ORIENTATION[plane] * symplectic_norm(&vector);
        let (p, _) = PLANES[plane];
        if !(norm > 0.0) || vector[p].modulus() == 0.0 {
            return Err(OpticsError::UnstableOptics(
                ErrorInfo::new("mode-normalisation", "eigenvector has no positive symplectic norm")
                    .with_context("plane", plane)
                    .with_context("norm", norm),
            ));
        }
        let rotation = vector[p].conj() / vector[p].modulus();
        vector *= rotation / norm.sqrt();
        modes.push(Eigenmode {
            eigenvalue: eigenvalues[index],
            vector,
        });
    }
    tracing::debug!(
        tunes = ?modes.iter().map(|m| phase(&m.eigenvalue)).collect::<Vec<_>>(),
        "6D eigenmodes"
    );
    let mut iter = modes.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(x), Some(y), Some(z)) => Ok([x, y, z]),
        _ => Err(OpticsError::unstable("mode-unassigned", "mode assignment incomplete")),
    }
}

/// Beta, alpha and raw phase of `plane` carried by the vector `v`.
fn mode_twiss(v: &DVector<Complex<f64>>, plane: usize) -> (f64, f64, f64) {
    let (p, q) = PLANES[plane];
    let beta = v[p].norm_sqr();
    let alpha = -(v[q] * v[p].conj()).re;
    (alpha, beta, v[p].argument())
}

/// Full 6D analysis: one-turn eigenmodes propagated through `ms`.
pub fn analyze_full(mt: &DMatrix<f64>, ms: &[DMatrix<f64>]) -> Result<ModalOptics, OpticsError> {
    let modes = eigenmodes(mt)?;
    let mut columns: Vec<Vec<(f64, f64, f64)>> = vec![Vec::with_capacity(ms.len()); 3];
    for matrix in ms {
        check_square(matrix, 6, "cumulative matrix")?;
        let transport = matrix.map(|value| Complex::new(value, 0.0));
        for (plane, mode) in modes.iter().enumerate() {
            let propagated = &transport * &mode.vector;
            columns[plane].push(mode_twiss(&propagated, plane));
        }
    }
    let phases: Vec<Vec<f64>> = columns
        .iter()
        .map(|column| unwrap_phase(&column.iter().map(|t| t.2).collect::<Vec<_>>()))
        .collect();
    let points = (0..ms.len())
        .map(|idx| ModalPoint {
            alpha: [columns[0][idx].0, columns[1][idx].0],
            beta: [columns[0][idx].1, columns[1][idx].1],
            mu: phases.iter().map(|mu| mu[idx]).collect(),
            coupling: None,
        })
        .collect();
    let start_twiss: Vec<(f64, f64, f64)> = modes
        .iter()
        .enumerate()
        .map(|(plane, mode)| mode_twiss(&mode.vector, plane))
        .collect();
    Ok(ModalOptics {
        eigenvalues: modes.iter().map(|mode| mode.eigenvalue).collect(),
        start: ModalPoint {
            alpha: [start_twiss[0].0, start_twiss[1].0],
            beta: [start_twiss[0].1, start_twiss[1].1],
            mu: modes.iter().map(|mode| phase(&mode.eigenvalue)).collect(),
            coupling: None,
        },
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn rotation(alpha: f64, beta: f64, mu: f64) -> [[f64; 2]; 2] {
        let gamma = (1.0 + alpha * alpha) / beta;
        let (s, c) = mu.sin_cos();
        [[c + alpha * s, beta * s], [-gamma * s, c - alpha * s]]
    }

    fn uncoupled(blocks: [[[f64; 2]; 2]; 3]) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(6, 6);
        for (k, block) in blocks.iter().enumerate() {
            for i in 0..2 {
                for j in 0..2 {
                    m[(2 * k + i, 2 * k + j)] = block[i][j];
                }
            }
        }
        m
    }

    #[test]
    fn uncoupled_modes_match_plane_twiss() {
        // longitudinal block laid out as (delta, ct)
        let z = rotation(0.0, 20.0, TAU * 0.03);
        let z_delta_ct = [[z[1][1], z[1][0]], [z[0][1], z[0][0]]];
        let mt = uncoupled([
            rotation(-1.2, 9.0, TAU * 0.27),
            rotation(0.6, 1.5, TAU * 0.62),
            z_delta_ct,
        ]);
        let modes = eigenmodes(&mt).unwrap();
        let (alpha, beta, _) = mode_twiss(&modes[0].vector, 0);
        assert!((alpha + 1.2).abs() < 1e-9 && (beta - 9.0).abs() < 1e-9);
        let (alpha, beta, _) = mode_twiss(&modes[1].vector, 1);
        assert!((alpha - 0.6).abs() < 1e-9 && (beta - 1.5).abs() < 1e-9);
        assert!((phase(&modes[0].eigenvalue) / TAU - 0.27).abs() < 1e-9);
        assert!((phase(&modes[1].eigenvalue) / TAU - 0.62).abs() < 1e-9);
        assert!((phase(&modes[2].eigenvalue) / TAU - 0.03).abs() < 1e-9);
    }
}
