use std::error::Error;
use std::path::{Path, PathBuf};

use twiss_lattice::Ring;
use twiss_linopt::LinoptOpts;

pub mod linopt;
pub mod tune;

pub(crate) fn load_inputs(
    lattice: &Path,
    config: Option<&PathBuf>,
) -> Result<(Ring, LinoptOpts), Box<dyn Error>> {
    let ring = Ring::load(lattice)?;
    let opts = match config {
        Some(path) => LinoptOpts::load(path)?,
        None => LinoptOpts::default(),
    };
    tracing::debug!(
        lattice = %lattice.display(),
        segments = ring.elements.len(),
        radiation = ring.radiation,
        "loaded lattice"
    );
    Ok((ring, opts))
}
