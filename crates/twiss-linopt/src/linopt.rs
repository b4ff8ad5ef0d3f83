use nalgebra::{Complex, ComplexField, DMatrix};
use twiss_core::{
    ErrorInfo, Lattice, Mode, OpticsError, OpticsModel, Orbit, OrbitFinder, OrbitRequest, RefPts,
    TransferMatrixProvider, SPEED_OF_LIGHT,
};

use crate::blocks::check_square;
use crate::chromaticity::{chromatic, off_momentum, Chromatic};
use crate::closure::tune;
use crate::config::LinoptOpts;
use crate::decompose::{analyze, Analysis, ModalOptics};
use crate::dispersion::{line_pair, momentum_pair, rf_shifted, OrbitPair};
use crate::line::TwissInput;
use crate::record::{assemble, BeamData, LinearOptics, PointInputs};

fn shape_error(what: &str, expected: usize, found: usize) -> OpticsError {
    OpticsError::DimensionMismatch(
        ErrorInfo::new("collaborator-shape", format!("{what} count does not match the request"))
            .with_context("expected", expected)
            .with_context("found", found),
    )
}

fn analysis_for(mode: Mode, opts: &LinoptOpts) -> Analysis {
    match mode {
        Mode::Mode6D => Analysis::Full,
        Mode::Mode4D if opts.coupled => Analysis::Coupled,
        Mode::Mode4D => Analysis::Uncoupled,
    }
}

/// Orbits and matrices around the central orbit, with shapes checked.
struct Central {
    mode: Mode,
    orbit0: Orbit,
    orbits: Vec<Orbit>,
    one_turn: DMatrix<f64>,
    matrices: Vec<DMatrix<f64>>,
}

fn central<L: OrbitFinder + TransferMatrixProvider>(
    lattice: &L,
    refpts: &[usize],
    request: &OrbitRequest<'_>,
) -> Result<Central, OpticsError> {
    let (orbit0, orbits) = lattice.find_orbit(refpts, request)?;
    let (one_turn, matrices) = lattice.transfer_matrices(
        refpts,
        request.mode,
        &orbit0,
        request.tolerances,
        request.keep_lattice,
    )?;
    if orbits.len() != refpts.len() {
        return Err(shape_error("orbit", refpts.len(), orbits.len()));
    }
    if matrices.len() != refpts.len() {
        return Err(shape_error("matrix", refpts.len(), matrices.len()));
    }
    let dim = request.mode.dimension();
    check_square(&one_turn, dim, "one-turn matrix")?;
    for matrix in &matrices {
        check_square(matrix, dim, "cumulative matrix")?;
    }
    Ok(Central {
        mode: request.mode,
        orbit0,
        orbits,
        one_turn,
        matrices,
    })
}

/// Rejects radiating lattices for analyses defined only in 4D.
pub(crate) fn require_radiation_off<L: Lattice>(
    lattice: &L,
    what: &str,
) -> Result<(), OpticsError> {
    if lattice.is_radiating() {
        return Err(OpticsError::Lattice(
            ErrorInfo::new("radiation-on", format!("{what} need a non-radiating lattice"))
                .with_hint("switch radiation off first"),
        ));
    }
    Ok(())
}

/// `damping_time[i] = L / (c (-ln |lambda_i|))`.
pub fn damping_times(eigenvalues: &[Complex<f64>], length: f64) -> [f64; 3] {
    let mut times = [f64::INFINITY; 3];
    for (time, eigenvalue) in times.iter_mut().zip(eigenvalues) {
        *time = length / SPEED_OF_LIGHT / -eigenvalue.modulus().ln();
    }
    times
}

fn finish<L: Lattice>(
    lattice: &L,
    refpts: &[usize],
    central: Central,
    modal: ModalOptics,
    pair: &OrbitPair,
    chromatic: Option<Chromatic>,
    get_w: bool,
) -> Result<LinearOptics, OpticsError> {
    let mode = central.mode;
    let positions = lattice.s_positions()?;
    let length = lattice.circumference()?;
    let dispersion = pair.points();
    let w = chromatic.as_ref().filter(|_| get_w);
    let start = assemble(PointInputs {
        index: 0,
        s: length,
        modal: &modal.start,
        orbit: central.orbit0,
        dispersion: pair.start(),
        matrix: central.one_turn,
        w: w.map(|c| c.w_start),
    });
    let points = refpts
        .iter()
        .zip(central.orbits)
        .zip(central.matrices)
        .enumerate()
        .map(|(k, ((&index, orbit), matrix))| {
            assemble(PointInputs {
                index,
                s: positions[index],
                modal: &modal.points[k],
                orbit,
                dispersion: dispersion[k],
                matrix,
                w: w.map(|c| c.w_points[k]),
            })
        })
        .collect();
    let beam = BeamData {
        tune: modal.eigenvalues.iter().map(tune).collect(),
        chromaticity: chromatic.map(|c| c.chromaticity),
        damping_time: (mode == Mode::Mode6D).then(|| damping_times(&modal.eigenvalues, length)),
    };
    Ok(LinearOptics {
        mode,
        start,
        beam,
        points,
    })
}

/// Linear optics of a periodic lattice.
///
/// Radiating lattices are analysed in 6D, where dispersion and chromaticity
/// come from RF-shifted copies of the lattice; all others in 4D at `opts.dp`.
pub fn linopt<L: OpticsModel>(
    lattice: &L,
    refpts: &RefPts,
    opts: &LinoptOpts,
) -> Result<LinearOptics, OpticsError> {
    opts.validate()?;
    let indices = refpts.resolve(lattice.segment_count())?;
    let mode = if lattice.is_radiating() {
        Mode::Mode6D
    } else {
        Mode::Mode4D
    };
    let analysis = analysis_for(mode, opts);
    tracing::debug!(?mode, ?analysis, refpts = indices.len(), "linear optics");
    let tolerances = &opts.tolerances;
    let request = OrbitRequest {
        mode,
        dp: opts.dp,
        guess: None,
        orbit: opts.orbit,
        tolerances,
        keep_lattice: opts.keep_lattice,
    };
    let central = central(lattice, &indices, &request)?;
    let modal = analyze(analysis, &central.one_turn, &central.matrices)?;
    let wanted: &[usize] = if opts.get_w { indices.as_slice() } else { &[] };

    let (pair, chromatic) = match mode {
        Mode::Mode4D => {
            let pair = momentum_pair(lattice, &indices, &central.orbit0, tolerances)?;
            let chromatic = if opts.wants_chromaticity() {
                let up = off_momentum(lattice, wanted, mode, &pair.up, analysis, tolerances)?;
                let down =
                    off_momentum(lattice, wanted, mode, &pair.down, analysis, tolerances)?;
                Some(chromatic(&up, &down, pair.delta()))
            } else {
                None
            };
            (pair, chromatic)
        }
        Mode::Mode6D => {
            let shifted = rf_shifted(lattice, &indices, &central.orbit0, tolerances)?;
            let chromatic = if opts.wants_chromaticity() {
                let orbits = &shifted.orbits;
                let (up, down) = (&shifted.up, &shifted.down);
                let up = off_momentum(up, wanted, mode, &orbits.up, analysis, tolerances)?;
                let down =
                    off_momentum(down, wanted, mode, &orbits.down, analysis, tolerances)?;
                Some(chromatic(&up, &down, orbits.delta()))
            } else {
                None
            };
            (shifted.orbits, chromatic)
        }
    };
    finish(lattice, &indices, central, modal, &pair, chromatic, opts.get_w)
}

/// Linear optics of an open transfer line from supplied entrance conditions.
///
/// The line is analysed in 4D. `opts.orbit` is the entrance orbit (zero when
/// absent); no closed orbit is searched. Chromaticity and W close the line's
/// own off-momentum map, so they fail like a ring would if that map is unstable.
pub fn linopt_line<L: Lattice + OrbitFinder + TransferMatrixProvider>(
    lattice: &L,
    refpts: &RefPts,
    twiss_in: &TwissInput,
    opts: &LinoptOpts,
) -> Result<LinearOptics, OpticsError> {
    opts.validate()?;
    let start = twiss_in.start()?;
    let indices = refpts.resolve(lattice.segment_count())?;
    let mode = Mode::Mode4D;
    let analysis = analysis_for(mode, opts);
    tracing::debug!(?analysis, refpts = indices.len(), "transfer line optics");
    let tolerances = &opts.tolerances;
    let orbit = opts.orbit.unwrap_or([0.0; 6]);
    let request = OrbitRequest {
        mode,
        dp: orbit[4],
        guess: None,
        orbit: Some(orbit),
        tolerances,
        keep_lattice: opts.keep_lattice,
    };
    let central = central(lattice, &indices, &request)?;
    let modal = analyze(analysis, &start.mxx, &central.matrices)?;
    let pair = line_pair(lattice, &indices, &central.orbit0, &start.dispersion, tolerances)?;
    let chromatic = if opts.wants_chromaticity() {
        let wanted: &[usize] = if opts.get_w { indices.as_slice() } else { &[] };
        let up = off_momentum(lattice, wanted, mode, &pair.up, analysis, tolerances)?;
        let down = off_momentum(lattice, wanted, mode, &pair.down, analysis, tolerances)?;
        Some(chromatic(&up, &down, pair.delta()))
    } else {
        None
    };
    finish(lattice, &indices, central, modal, &pair, chromatic, opts.get_w)
}

/// Horizontal and vertical fractional tunes at momentum deviation `dp`.
pub fn get_tune<L: OpticsModel>(
    lattice: &L,
    dp: f64,
    opts: &LinoptOpts,
) -> Result<Vec<f64>, OpticsError> {
    require_radiation_off(lattice, "tunes at fixed momentum")?;
    let opts = LinoptOpts {
        dp,
        get_chrom: false,
        get_w: false,
        ..opts.clone()
    };
    Ok(linopt(lattice, &RefPts::none(), &opts)?.beam.tune)
}

/// Transverse chromaticity of a periodic lattice at momentum deviation `dp`.
pub fn get_chrom<L: OpticsModel>(
    lattice: &L,
    dp: f64,
    opts: &LinoptOpts,
) -> Result<[f64; 2], OpticsError> {
    require_radiation_off(lattice, "chromaticities at fixed momentum")?;
    let opts = LinoptOpts {
        dp,
        get_chrom: true,
        get_w: false,
        ..opts.clone()
    };
    linopt(lattice, &RefPts::none(), &opts)?
        .beam
        .chromaticity
        .ok_or_else(|| OpticsError::Lattice(ErrorInfo::new("chrom-missing", "no chromaticity computed")))
}
