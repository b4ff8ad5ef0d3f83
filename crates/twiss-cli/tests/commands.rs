use std::fs;
use std::path::{Path, PathBuf};

use twiss_cli::commands::linopt::{self, parse_refpts, LinoptArgs};
use twiss_cli::commands::tune::{summarize, TuneArgs};
use twiss_core::RefPts;
use twiss_lattice::{fodo_cell, FodoParams, Ring};
use twiss_linopt::optics_from_json;

fn write_cell(dir: &Path) -> PathBuf {
    let params = FodoParams::default();
    let ring = Ring::new(fodo_cell(&params), params.energy).unwrap();
    let path = dir.join("cell.json");
    fs::write(&path, serde_json::to_string(&ring).unwrap()).unwrap();
    path
}

#[test]
fn refpts_parse_from_the_command_line() {
    assert_eq!(parse_refpts("all", 2).unwrap(), RefPts::Indices(vec![0, 1, 2]));
    assert_eq!(parse_refpts("none", 2).unwrap(), RefPts::none());
    assert_eq!(parse_refpts("0, 3,5", 8).unwrap(), RefPts::Indices(vec![0, 3, 5]));
    assert!(parse_refpts("1,x", 8).is_err());
}

#[test]
fn linopt_writes_a_verified_document() {
    let dir = tempfile::tempdir().unwrap();
    let lattice = write_cell(dir.path());
    let config = dir.path().join("opts.yaml");
    fs::write(&config, "coupled: false\n").unwrap();
    let out = dir.path().join("out");
    let args = LinoptArgs {
        lattice,
        config: Some(config),
        refpts: "0,4,8".to_string(),
        chrom: true,
        w: false,
        twiss_in: None,
        out: out.clone(),
    };
    linopt::run(&args).unwrap();

    let text = fs::read_to_string(out.join("optics.json")).unwrap();
    let optics = optics_from_json(&text).unwrap();
    assert_eq!(optics.points.len(), 3);
    assert!(optics.beam.chromaticity.is_some());
    assert!(optics.points[0].gamma.is_none());

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["points"], 3);
    assert_eq!(summary["mode"], "4d");
}

#[test]
fn linopt_runs_a_transfer_line_from_twiss_input() {
    let dir = tempfile::tempdir().unwrap();
    let lattice = write_cell(dir.path());
    let twiss_in = dir.path().join("twiss_in.yaml");
    fs::write(&twiss_in, "alpha: [0.0, 0.0]\nbeta: [5.0, 2.0]\n").unwrap();
    let out = dir.path().join("line");
    let args = LinoptArgs {
        lattice,
        config: None,
        refpts: "none".to_string(),
        chrom: false,
        w: false,
        twiss_in: Some(twiss_in),
        out: out.clone(),
    };
    linopt::run(&args).unwrap();
    let optics = optics_from_json(&fs::read_to_string(out.join("optics.json")).unwrap()).unwrap();
    assert!((optics.start.beta[0] - 5.0).abs() < 1e-12);
}

#[test]
fn tune_summary_reports_chromaticity_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let lattice = write_cell(dir.path());
    let plain = summarize(&TuneArgs {
        lattice: lattice.clone(),
        config: None,
        dp: 0.0,
        chrom: false,
    })
    .unwrap();
    assert_eq!(plain.tune.len(), 2);
    assert!(plain.chromaticity.is_none());

    let chromatic = summarize(&TuneArgs {
        lattice,
        config: None,
        dp: 0.0,
        chrom: true,
    })
    .unwrap();
    assert_eq!(chromatic.tune, plain.tune);
    assert!(chromatic.chromaticity.unwrap().iter().all(|xi| *xi < 0.0));
}

#[test]
fn missing_lattice_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = TuneArgs {
        lattice: dir.path().join("absent.yaml"),
        config: None,
        dp: 0.0,
        chrom: false,
    };
    assert!(summarize(&args).is_err());
}
