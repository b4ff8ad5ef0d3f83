use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use twiss_core::{Lattice, RefPts};
use twiss_linopt::serde::from_yaml_slice;
use twiss_linopt::{linopt, linopt_line, optics_hash, optics_to_json, TwissInput};

use super::load_inputs;
use crate::write_json;

#[derive(Args, Debug)]
pub struct LinoptArgs {
    /// Lattice description; JSON when the extension is `.json`, YAML otherwise.
    #[arg(long)]
    pub lattice: PathBuf,
    /// YAML options overriding the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Reference points: `all`, `none` or comma-separated indices.
    #[arg(long, default_value = "all")]
    pub refpts: String,
    /// Compute the chromaticity.
    #[arg(long)]
    pub chrom: bool,
    /// Compute the chromatic amplitude functions.
    #[arg(long)]
    pub w: bool,
    /// YAML entrance Twiss; treats the lattice as an open transfer line.
    #[arg(long)]
    pub twiss_in: Option<PathBuf>,
    /// Output directory for `optics.json`.
    #[arg(long)]
    pub out: PathBuf,
}

/// Parses `all`, `none` or `i,j,...` against a lattice of `segments` segments.
pub fn parse_refpts(text: &str, segments: usize) -> Result<RefPts, Box<dyn Error>> {
    match text.trim() {
        "all" => Ok(RefPts::all(segments)),
        "none" | "" => Ok(RefPts::none()),
        list => {
            let indices = list
                .split(',')
                .map(|item| item.trim().parse::<usize>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RefPts::Indices(indices))
        }
    }
}

pub fn run(args: &LinoptArgs) -> Result<(), Box<dyn Error>> {
    let (ring, mut opts) = load_inputs(&args.lattice, args.config.as_ref())?;
    opts.get_chrom |= args.chrom;
    opts.get_w |= args.w;
    let refpts = parse_refpts(&args.refpts, ring.segment_count())?;

    let optics = match &args.twiss_in {
        Some(path) => {
            let twiss_in: TwissInput = from_yaml_slice(&fs::read(path)?)?;
            linopt_line(&ring, &refpts, &twiss_in, &opts)?
        }
        None => linopt(&ring, &refpts, &opts)?,
    };
    tracing::info!(
        points = optics.points.len(),
        tune = ?optics.beam.tune,
        "linear optics computed"
    );

    fs::create_dir_all(&args.out)?;
    fs::write(args.out.join("optics.json"), optics_to_json(&optics)?)?;
    let summary = serde_json::json!({
        "lattice": args.lattice.display().to_string(),
        "mode": optics.mode,
        "points": optics.points.len(),
        "tune": optics.beam.tune,
        "chromaticity": optics.beam.chromaticity,
        "optics_hash": optics_hash(&optics)?,
    });
    write_json(args.out.join("summary.json"), &summary)?;
    Ok(())
}
