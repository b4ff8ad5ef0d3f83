#![deny(missing_docs)]
#![doc = "Core traits and data types for the linear optics engine. The engine consumes \
these traits; lattice models implement them."]

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub mod errors;
pub mod refpts;
mod types;

pub use errors::{ErrorInfo, OpticsError};
pub use refpts::RefPts;
pub use types::{Mode, Orbit, SegmentClass, SegmentInfo, Tolerances};

/// Speed of light in vacuum [m/s].
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Structural view of an ordered lattice.
pub trait Lattice {
    /// Number of segments in the lattice.
    fn segment_count(&self) -> usize;

    /// Returns the description of the segment at `index`.
    fn segment(&self, index: usize) -> Result<SegmentInfo, OpticsError>;

    /// Whether longitudinal motion (RF cavities, radiation) is active.
    fn is_radiating(&self) -> bool;

    /// Path positions of all segment entrances plus the lattice end.
    fn s_positions(&self) -> Result<Vec<f64>, OpticsError> {
        let mut positions = Vec::with_capacity(self.segment_count() + 1);
        positions.push(0.0);
        let mut s = 0.0;
        for index in 0..self.segment_count() {
            s += self.segment(index)?.length;
            positions.push(s);
        }
        Ok(positions)
    }

    /// Total path length of the lattice.
    fn circumference(&self) -> Result<f64, OpticsError> {
        (0..self.segment_count()).try_fold(0.0, |acc, index| -> Result<f64, OpticsError> {
            Ok(acc + self.segment(index)?.length)
        })
    }
}

/// Parameters for a single closed-orbit request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitRequest<'a> {
    /// Dimension of the orbit search.
    pub mode: Mode,
    /// Momentum deviation (ignored in 6D, where it comes out of the search).
    pub dp: f64,
    /// Starting point for the iteration.
    pub guess: Option<Orbit>,
    /// Externally supplied entrance orbit; when present no search is run.
    pub orbit: Option<Orbit>,
    /// Numerical tolerances for the search.
    pub tolerances: &'a Tolerances,
    /// Hint that momentum-independent integration state may be reused.
    pub keep_lattice: bool,
}

/// Finds the closed orbit of a lattice and the orbit at reference points.
pub trait OrbitFinder {
    /// Returns the entrance orbit and the orbit at each of `refpts`.
    fn find_orbit(
        &self,
        refpts: &[usize],
        request: &OrbitRequest<'_>,
    ) -> Result<(Orbit, Vec<Orbit>), OpticsError>;
}

/// Produces linear transfer matrices around a given orbit.
pub trait TransferMatrixProvider {
    /// Returns the one-turn matrix and the cumulative matrix from the lattice
    /// start to each of `refpts`. Matrices are 4x4 in 4D and 6x6 in 6D.
    fn transfer_matrices(
        &self,
        refpts: &[usize],
        mode: Mode,
        orbit: &Orbit,
        tolerances: &Tolerances,
        keep_lattice: bool,
    ) -> Result<(DMatrix<f64>, Vec<DMatrix<f64>>), OpticsError>;
}

/// Reads and sets the nominal RF frequency.
pub trait RfControl: Sized {
    /// Nominal RF frequency [Hz].
    fn rf_frequency(&self) -> Result<f64, OpticsError>;

    /// Returns a copy of the lattice with every cavity set to `frequency`.
    fn with_rf_frequency(&self, frequency: f64) -> Result<Self, OpticsError>;
}

/// Computes the momentum compaction factor.
pub trait MomentumCompaction {
    /// Momentum compaction factor of the lattice with radiation switched off.
    fn momentum_compaction(&self, tolerances: &Tolerances) -> Result<f64, OpticsError>;
}

/// Every collaborator the optics engine needs, bundled into one bound.
pub trait OpticsModel:
    Lattice + OrbitFinder + TransferMatrixProvider + RfControl + MomentumCompaction
{
}

impl<T> OpticsModel for T where
    T: Lattice + OrbitFinder + TransferMatrixProvider + RfControl + MomentumCompaction
{
}

/// Identifies the schema of serialized optics payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}
