//! Edwards-Teng / Sagan-Rubin normal-mode analysis of 4x4 maps.

use nalgebra::{Complex, DMatrix, Matrix2};
use serde::{Deserialize, Serialize};
use twiss_core::{ErrorInfo, OpticsError};

use crate::blocks::{jmat, sign, symplectic_conjugate, Blocks};
use crate::closure::{closure, phase, Closure};
use crate::modes6;
use crate::propagate::{slice_twiss, unwrap_phase};

/// Which analysis turns a one-period map into normal modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Analysis {
    /// Diagonal 2x2 blocks taken as the modes.
    Uncoupled,
    /// 4x4 block diagonalization with coupling matrix `C`.
    Coupled,
    /// 6x6 eigenvector analysis of three modes.
    Full,
}

/// Block-diagonal form of a coupled 4x4 map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoupledForm {
    /// Coupling strength, 1 without coupling.
    pub g: f64,
    /// Coupling matrix.
    pub c: Matrix2<f64>,
    /// Mode A block.
    pub a: Matrix2<f64>,
    /// Mode B block.
    pub b: Matrix2<f64>,
}

/// Coupling data carried by a point of the coupled analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling {
    /// Local coupling strength.
    pub gamma: f64,
    /// Local mode A block.
    pub a: Matrix2<f64>,
    /// Local mode B block.
    pub b: Matrix2<f64>,
    /// Local coupling matrix.
    pub c: Matrix2<f64>,
}

/// Modal optics at one location.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalPoint {
    /// Alpha of the two transverse modes.
    pub alpha: [f64; 2],
    /// Beta of the two transverse modes.
    pub beta: [f64; 2],
    /// Phase of every mode.
    pub mu: Vec<f64>,
    /// Present for the coupled analysis only.
    pub coupling: Option<Coupling>,
}

/// Result of an analysis: eigenvalues, entrance optics and propagated optics.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalOptics {
    /// One eigenvalue per mode.
    pub eigenvalues: Vec<Complex<f64>>,
    /// Optics at the entrance.
    pub start: ModalPoint,
    /// Optics at each cumulative matrix, phases unwrapped.
    pub points: Vec<ModalPoint>,
}

/// Block-diagonalizes a 4x4 map `mxx` into modes A and B.
pub fn block_diagonalize(mxx: &DMatrix<f64>) -> Result<CoupledForm, OpticsError> {
    let Blocks { mm, nn, m, n } = Blocks::split(mxx)?;
    let j = jmat();
    let h = m + j * n.transpose() * j.transpose();
    let det_h = h.determinant();
    if det_h == 0.0 {
        tracing::debug!("uncoupled branch of the block diagonalization");
        return Ok(CoupledForm {
            g: 1.0,
            c: -h,
            a: mm,
            b: nn,
        });
    }
    let t = (mm - nn).trace();
    let t2h = t * t + 4.0 * det_h;
    if !(t2h > 0.0) {
        return Err(OpticsError::UnstableOptics(
            ErrorInfo::new("coupling-unstable", "modes are too strongly coupled to separate")
                .with_context("trace_difference", t)
                .with_context("det_h", det_h),
        ));
    }
    let g2 = 0.5 * (1.0 + (t * t / t2h).sqrt());
    let g = g2.sqrt();
    let c = -h * (sign(t) / (g * t2h.sqrt()));
    let cp = symplectic_conjugate(&c);
    let a = mm * g2 - (m * cp + c * n) * g + c * nn * cp;
    let b = nn * g2 + (cp * m + n * c) * g + cp * mm * c;
    tracing::debug!(g, det_h, "coupled branch of the block diagonalization");
    Ok(CoupledForm { g, c, a, b })
}

/// Local mode transports `e`, `f` and blocks of the cumulative matrix `ms`.
fn coupled_point(
    form: &CoupledForm,
    ms: &DMatrix<f64>,
) -> Result<(Matrix2<f64>, Matrix2<f64>, Coupling), OpticsError> {
    let Blocks { mm, nn, m, n } = Blocks::split(ms)?;
    let cp = symplectic_conjugate(&form.c);
    let det = (n * form.c + nn * form.g).determinant();
    if !(det > 0.0) {
        return Err(OpticsError::UnstableOptics(
            ErrorInfo::new(
                "coupling-point-unstable",
                "local coupling determinant is not positive",
            )
            .with_context("determinant", det),
        ));
    }
    let gamma = det.sqrt();
    let e = (mm * form.g - m * cp) / gamma;
    let f = (n * form.c + nn * form.g) / gamma;
    let coupling = Coupling {
        gamma,
        a: e * form.a * symplectic_conjugate(&e),
        b: f * form.b * symplectic_conjugate(&f),
        c: (mm * form.c + m * form.g) * symplectic_conjugate(&f),
    };
    Ok((e, f, coupling))
}

/// Propagates two 2x2 modes through their local transports.
fn propagate_pair(
    modes: &[Closure; 2],
    transports: &[[Matrix2<f64>; 2]],
    couplings: Vec<Option<Coupling>>,
) -> Vec<ModalPoint> {
    let slices: Vec<[(f64, f64, f64); 2]> = transports
        .iter()
        .map(|pair| {
            [
                slice_twiss(&pair[0], modes[0].alpha, modes[0].beta),
                slice_twiss(&pair[1], modes[1].alpha, modes[1].beta),
            ]
        })
        .collect();
    let mu_a = unwrap_phase(&slices.iter().map(|s| s[0].2).collect::<Vec<_>>());
    let mu_b = unwrap_phase(&slices.iter().map(|s| s[1].2).collect::<Vec<_>>());
    slices
        .iter()
        .zip(couplings)
        .enumerate()
        .map(|(idx, (s, coupling))| ModalPoint {
            alpha: [s[0].0, s[1].0],
            beta: [s[0].1, s[1].1],
            mu: vec![mu_a[idx], mu_b[idx]],
            coupling,
        })
        .collect()
}

fn start_point(modes: &[Closure; 2], coupling: Option<Coupling>) -> ModalPoint {
    ModalPoint {
        alpha: [modes[0].alpha, modes[1].alpha],
        beta: [modes[0].beta, modes[1].beta],
        mu: modes.iter().map(|mode| phase(&mode.eigenvalue)).collect(),
        coupling,
    }
}

fn analyze_uncoupled(mxx: &DMatrix<f64>, ms: &[DMatrix<f64>]) -> Result<ModalOptics, OpticsError> {
    let blocks = Blocks::split(mxx)?;
    let modes = [closure(&blocks.mm)?, closure(&blocks.nn)?];
    let transports = ms
        .iter()
        .map(|matrix| Blocks::split(matrix).map(|b| [b.mm, b.nn]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ModalOptics {
        eigenvalues: modes.iter().map(|mode| mode.eigenvalue).collect(),
        start: start_point(&modes, None),
        points: propagate_pair(&modes, &transports, vec![None; ms.len()]),
    })
}

fn analyze_coupled(mxx: &DMatrix<f64>, ms: &[DMatrix<f64>]) -> Result<ModalOptics, OpticsError> {
    let form = block_diagonalize(mxx)?;
    let modes = [closure(&form.a)?, closure(&form.b)?];
    let mut transports = Vec::with_capacity(ms.len());
    let mut couplings = Vec::with_capacity(ms.len());
    for matrix in ms {
        let (e, f, coupling) = coupled_point(&form, matrix)?;
        transports.push([e, f]);
        couplings.push(Some(coupling));
    }
    let start = Coupling {
        gamma: form.g,
        a: form.a,
        b: form.b,
        c: form.c,
    };
    Ok(ModalOptics {
        eigenvalues: modes.iter().map(|mode| mode.eigenvalue).collect(),
        start: start_point(&modes, Some(start)),
        points: propagate_pair(&modes, &transports, couplings),
    })
}

/// Runs `analysis` on the one-period map `mxx` and the cumulative matrices `ms`.
pub fn analyze(
    analysis: Analysis,
    mxx: &DMatrix<f64>,
    ms: &[DMatrix<f64>],
) -> Result<ModalOptics, OpticsError> {
    match analysis {
        Analysis::Uncoupled => analyze_uncoupled(mxx, ms),
        Analysis::Coupled => analyze_coupled(mxx, ms),
        Analysis::Full => modes6::analyze_full(mxx, ms),
    }
}
