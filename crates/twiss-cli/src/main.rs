use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use twiss_cli::commands::{
    linopt::{self, LinoptArgs},
    tune::{self, TuneArgs},
};

#[derive(Parser, Debug)]
#[command(name = "twiss", about = "Linear optics of periodic lattices and transfer lines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the linear optics at reference points and write `optics.json`.
    Linopt(LinoptArgs),
    /// Print the tunes, and optionally the chromaticity, as JSON.
    Tune(TuneArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.command {
        Command::Linopt(args) => linopt::run(&args),
        Command::Tune(args) => tune::run(&args),
    }
}
