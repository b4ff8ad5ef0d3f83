use std::io::Write;

use twiss_core::{Lattice, OpticsError, RfControl};
use twiss_lattice::{fodo_ring, rf_fodo_ring, Element, FodoParams, Ring};

const RING_YAML: &str = r#"
energy: 3.0e9
elements:
  - type: quadrupole
    length: 0.5
    k: 1.2
  - type: drift
    length: 0.4
  - type: dipole
    length: 1.5
    angle: 0.1
  - type: marker
"#;

#[test]
fn yaml_ring_parses_with_defaults() -> Result<(), OpticsError> {
    let ring = Ring::from_yaml_str(RING_YAML)?;
    assert_eq!(ring.segment_count(), 4);
    assert_eq!(ring.energy, 3.0e9);
    assert!(!ring.is_radiating());
    assert!((ring.circumference()? - 2.4).abs() < 1e-12);
    let s = ring.s_positions()?;
    assert_eq!(s.len(), 5);
    assert!((s[3] - 2.4).abs() < 1e-12);
    Ok(())
}

#[test]
fn json_ring_loads_from_disk() -> Result<(), Box<dyn std::error::Error>> {
    let ring = fodo_ring(&FodoParams::default())?;
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    file.write_all(serde_json::to_string(&ring)?.as_bytes())?;
    let loaded = Ring::load(file.path())?;
    assert_eq!(loaded, ring);
    Ok(())
}

#[test]
fn negative_length_is_rejected_with_index() {
    let text = "elements:\n  - type: marker\n  - type: drift\n    length: -1.0\n";
    let err = Ring::from_yaml_str(text).unwrap_err();
    assert_eq!(err.info().code, "element-length");
    assert_eq!(err.info().context.get("index").map(String::as_str), Some("1"));
}

#[test]
fn unknown_element_is_a_serde_error() {
    let err = Ring::from_yaml_str("elements:\n  - type: wiggler\n").unwrap_err();
    assert!(matches!(err, OpticsError::Serde(_)));
}

#[test]
fn rf_frequency_can_be_shifted() -> Result<(), OpticsError> {
    let ring = rf_fodo_ring(&FodoParams::default(), 1e6, 100.0, 5e3)?;
    let f0 = ring.rf_frequency()?;
    let shifted = ring.with_rf_frequency(f0 + 10.0)?;
    assert!((shifted.rf_frequency()? - f0 - 10.0).abs() < 1e-6);
    assert!(shifted.rf_path_offset()? < 0.0);
    Ok(())
}

#[test]
fn rf_queries_fail_without_cavity() {
    let ring = fodo_ring(&FodoParams::default()).unwrap();
    let err = ring.rf_frequency().unwrap_err();
    assert_eq!(err.info().code, "rf-missing");
    assert!(ring.with_rf_frequency(1e8).is_err());
}

#[test]
fn radiation_switch_keeps_elements() {
    let ring = Ring::new(vec![Element::Drift { length: 1.0 }], 1e9).unwrap();
    let on = ring.radiation_on();
    assert!(on.is_radiating());
    assert_eq!(on.radiation_off(), ring);
}
