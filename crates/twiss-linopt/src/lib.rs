#![deny(missing_docs)]
#![doc = "Linear optics engine: normal-mode decomposition of one-period maps, Twiss \
propagation to reference points, dispersion, chromaticity and averaged optics."]

/// Segment-averaged optics.
pub mod average;
/// 2x2 block helpers and the symplectic unit matrix.
pub mod blocks;
/// Chromaticity and chromatic amplitude functions.
pub mod chromaticity;
/// Twiss closure of one-period 2x2 blocks.
pub mod closure;
/// Options of a linear optics run.
pub mod config;
pub mod decompose;
pub mod dispersion;
/// Stable content hashes.
pub mod hash;
/// Entrance conditions of open transfer lines.
pub mod line;
/// Entry points.
pub mod linopt;
/// 6D eigenmode analysis.
pub mod modes6;
/// Phase advance and Twiss propagation.
pub mod propagate;
/// Output records.
pub mod record;
/// Canonical JSON and YAML helpers.
pub mod serde;

pub use average::{avlinopt, AveragedOptics};
pub use config::LinoptOpts;
pub use decompose::{analyze, block_diagonalize, Analysis, CoupledForm};
pub use hash::{optics_hash, stable_hash_string};
pub use line::TwissInput;
pub use linopt::{get_chrom, get_tune, linopt, linopt_line};
pub use record::{BeamData, Block, LinearOptics, OpticsRecord};
pub use crate::serde::{optics_from_json, optics_to_json, OpticsDocument};
