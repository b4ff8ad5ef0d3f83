#![deny(missing_docs)]
#![doc = "Reference lattice model implementing the optics collaborator traits."]

/// Momentum compaction from off-momentum closed orbits.
pub mod compaction;
/// Element definitions and their tracking maps.
pub mod element;
/// Ready-made test lattices.
pub mod generators;
/// Numerical transfer matrices.
pub mod matrix;
/// Closed-orbit search.
pub mod orbit;
/// Ring container, loading and RF control.
pub mod ring;

pub use compaction::momentum_compaction;
pub use element::{Element, PassContext};
pub use generators::{coupled_fodo_ring, fodo_cell, fodo_ring, rf_fodo_ring, FodoParams};
pub use matrix::{find_m44, find_m66};
pub use orbit::{find_orbit4, find_orbit6};
pub use ring::Ring;
