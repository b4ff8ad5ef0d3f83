use proptest::prelude::*;
use twiss_core::{
    Mode, MomentumCompaction, OpticsError, OrbitFinder, OrbitRequest, Tolerances,
    TransferMatrixProvider,
};
use twiss_lattice::{
    find_m44, find_m66, find_orbit4, find_orbit6, fodo_ring, rf_fodo_ring, FodoParams, Ring,
};

fn default_ring() -> Ring {
    fodo_ring(&FodoParams::default()).unwrap()
}

fn radiating_ring() -> Ring {
    rf_fodo_ring(&FodoParams::default(), 1e6, 100.0, 5e3).unwrap()
}

fn determinant(ring: &Ring, dp: f64) -> f64 {
    let tolerances = Tolerances::default();
    let orbit = find_orbit4(ring, dp, None, &tolerances).unwrap();
    let (m, _) = find_m44(ring, &orbit, &[], &tolerances).unwrap();
    m.determinant()
}

#[test]
fn off_momentum_orbit_follows_dispersion() -> Result<(), OpticsError> {
    let ring = default_ring();
    let dp = 1e-4;
    let orbit = find_orbit4(&ring, dp, None, &Tolerances::default())?;
    let closed = ring.track(&orbit, Mode::Mode4D);
    for i in 0..4 {
        assert!((closed[i] - orbit[i]).abs() < 1e-12);
    }
    assert!((orbit[0] / dp - 1.0663).abs() < 1e-3);
    assert!((orbit[1] / dp - 0.3281).abs() < 1e-3);
    assert_eq!(orbit[4], dp);
    Ok(())
}

#[test]
fn momentum_compaction_of_the_fodo_ring() -> Result<(), OpticsError> {
    let mcf = default_ring().momentum_compaction(&Tolerances::default())?;
    assert!((mcf - 0.051384).abs() < 1e-5);
    Ok(())
}

#[test]
fn radiating_orbit_is_closed_and_decelerated() -> Result<(), OpticsError> {
    let ring = radiating_ring();
    let tolerances = Tolerances::default();
    let orbit = find_orbit6(&ring, None, &tolerances)?;
    let closed = ring.track(&orbit, Mode::Mode6D);
    let offset = ring.rf_path_offset()?;
    for i in 0..5 {
        assert!((closed[i] - orbit[i]).abs() < 1e-10);
    }
    assert!((closed[5] - orbit[5] - offset).abs() < 1e-10);
    // the cavity must restore the radiated energy
    assert!(orbit[5] < 0.0);
    Ok(())
}

#[test]
fn orbit_finder_honours_explicit_orbit() -> Result<(), OpticsError> {
    let ring = default_ring();
    let tolerances = Tolerances::default();
    let given = [1e-4, 0.0, 0.0, 0.0, 0.0, 0.0];
    let request = OrbitRequest {
        mode: Mode::Mode4D,
        dp: 0.0,
        guess: None,
        orbit: Some(given),
        tolerances: &tolerances,
        keep_lattice: false,
    };
    let (orbit0, orbits) = ring.find_orbit(&[0, 3], &request)?;
    assert_eq!(orbit0, given);
    assert_eq!(orbits.len(), 2);
    assert_eq!(orbits[0], given);
    Ok(())
}

#[test]
fn unordered_refpts_are_rejected() {
    let ring = default_ring();
    let err = ring
        .transfer_matrices(&[3, 1], Mode::Mode4D, &[0.0; 6], &Tolerances::default(), false)
        .unwrap_err();
    assert!(matches!(err, OpticsError::DimensionMismatch(_)));
}

#[test]
fn radiation_damps_the_one_turn_matrix() -> Result<(), OpticsError> {
    let ring = radiating_ring();
    let tolerances = Tolerances::default();
    let orbit = find_orbit6(&ring, None, &tolerances)?;
    let (m, _) = find_m66(&ring, &orbit, &[], &tolerances)?;
    let det = m.determinant();
    assert!(det < 1.0 && det > 0.99);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn transverse_matrix_is_area_preserving(dp in -1e-3f64..1e-3) {
        let det = determinant(&default_ring(), dp);
        prop_assert!((det - 1.0).abs() < 1e-6);
    }
}
