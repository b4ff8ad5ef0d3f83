use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use twiss_linopt::{get_chrom, get_tune};

use super::load_inputs;

#[derive(Args, Debug)]
pub struct TuneArgs {
    /// Lattice description; JSON when the extension is `.json`, YAML otherwise.
    #[arg(long)]
    pub lattice: PathBuf,
    /// YAML options overriding the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Momentum deviation.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub dp: f64,
    /// Report the chromaticity as well.
    #[arg(long)]
    pub chrom: bool,
}

/// Tunes and, on request, chromaticity of a lattice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneSummary {
    pub tune: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromaticity: Option<[f64; 2]>,
}

pub fn summarize(args: &TuneArgs) -> Result<TuneSummary, Box<dyn Error>> {
    let (ring, opts) = load_inputs(&args.lattice, args.config.as_ref())?;
    let tune = get_tune(&ring, args.dp, &opts)?;
    let chromaticity = if args.chrom {
        Some(get_chrom(&ring, args.dp, &opts)?)
    } else {
        None
    };
    Ok(TuneSummary { tune, chromaticity })
}

pub fn run(args: &TuneArgs) -> Result<(), Box<dyn Error>> {
    let summary = summarize(args)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
