use std::fs;

use twiss_core::{OpticsError, RefPts};
use twiss_lattice::{coupled_fodo_ring, FodoParams};
use twiss_linopt::{
    optics_from_json, optics_hash, optics_to_json, LinearOptics, LinoptOpts, OpticsDocument,
};

fn sample() -> LinearOptics {
    let ring = coupled_fodo_ring(&FodoParams::default(), 0.05).unwrap();
    let opts = LinoptOpts {
        get_w: true,
        ..LinoptOpts::default()
    };
    twiss_linopt::linopt(&ring, &RefPts::Indices(vec![0, 7, 40]), &opts).unwrap()
}

#[test]
fn document_round_trips_with_its_hash() -> Result<(), OpticsError> {
    let optics = sample();
    let text = optics_to_json(&optics)?;
    let decoded = optics_from_json(&text)?;
    assert_eq!(decoded, optics);
    assert_eq!(optics_hash(&decoded)?, optics_hash(&optics)?);
    Ok(())
}

#[test]
fn hash_is_stable_across_runs() -> Result<(), OpticsError> {
    assert_eq!(optics_hash(&sample())?, optics_hash(&sample())?);
    Ok(())
}

#[test]
fn tampered_payload_is_rejected() -> Result<(), OpticsError> {
    let optics = sample();
    let text = optics_to_json(&optics)?;
    let mut document: OpticsDocument = serde_json::from_str(&text).unwrap();
    document.optics.beam.tune[0] += 1e-3;
    let tampered = serde_json::to_string(&document).unwrap();
    let err = optics_from_json(&tampered).unwrap_err();
    assert_eq!(err.info().code, "hash-mismatch");
    Ok(())
}

#[test]
fn future_schema_is_rejected() -> Result<(), OpticsError> {
    let text = optics_to_json(&sample())?;
    let mut document: OpticsDocument = serde_json::from_str(&text).unwrap();
    document.schema.major += 1;
    let err = optics_from_json(&serde_json::to_string(&document).unwrap()).unwrap_err();
    assert_eq!(err.info().code, "schema-version");
    Ok(())
}

#[test]
fn uncoupled_records_omit_coupling_fields() -> Result<(), OpticsError> {
    let ring = coupled_fodo_ring(&FodoParams::default(), 0.05)?;
    let opts = LinoptOpts {
        coupled: false,
        ..LinoptOpts::default()
    };
    let optics = twiss_linopt::linopt(&ring, &RefPts::Indices(vec![1]), &opts)?;
    let value = serde_json::to_value(&optics.points[0]).unwrap();
    assert!(value.get("gamma").is_none());
    assert!(value.get("w").is_none());
    assert!(value.get("beta").is_some());
    Ok(())
}

#[test]
fn options_load_from_yaml_file() -> Result<(), OpticsError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linopt.yaml");
    fs::write(&path, "get_chrom: true\ncoupled: false\ntolerances:\n  dp_step: 2.0e-6\n").unwrap();
    let opts = LinoptOpts::load(&path)?;
    assert!(opts.get_chrom && !opts.coupled);
    assert_eq!(opts.tolerances.dp_step, 2e-6);
    let missing = LinoptOpts::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(missing.info().code, "config-read");
    Ok(())
}
