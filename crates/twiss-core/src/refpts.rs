//! Reference-point selection.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, OpticsError};

/// Points of a lattice at which optics are reported.
///
/// Index `n` (the segment count) refers to the end of the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefPts {
    /// Strictly increasing segment indices.
    Indices(Vec<usize>),
    /// Boolean mask of length at most `n + 1`.
    Mask(Vec<bool>),
}

impl RefPts {
    /// Selects no point.
    pub fn none() -> Self {
        RefPts::Indices(Vec::new())
    }

    /// Selects every segment entrance plus the lattice end.
    pub fn all(segments: usize) -> Self {
        RefPts::Indices((0..=segments).collect())
    }

    /// Resolves the selection into validated, ordered indices.
    pub fn resolve(&self, segments: usize) -> Result<Vec<usize>, OpticsError> {
        match self {
            RefPts::Indices(indices) => {
                if let Some(&bad) = indices.iter().find(|&&idx| idx > segments) {
                    return Err(OpticsError::DimensionMismatch(
                        ErrorInfo::new("refpts-range", "reference index beyond lattice end")
                            .with_context("index", bad)
                            .with_context("segments", segments),
                    ));
                }
                if indices.windows(2).any(|pair| pair[0] >= pair[1]) {
                    return Err(OpticsError::DimensionMismatch(
                        ErrorInfo::new("refpts-order", "reference indices must be strictly increasing")
                            .with_hint("sort the indices and remove duplicates"),
                    ));
                }
                Ok(indices.clone())
            }
            RefPts::Mask(mask) => {
                if mask.len() > segments + 1 {
                    return Err(OpticsError::DimensionMismatch(
                        ErrorInfo::new("refpts-mask", "reference mask longer than lattice")
                            .with_context("mask", mask.len())
                            .with_context("segments", segments),
                    ));
                }
                Ok(mask
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, &selected)| selected.then_some(idx))
                    .collect())
            }
        }
    }
}

impl Default for RefPts {
    fn default() -> Self {
        RefPts::none()
    }
}

impl From<Vec<usize>> for RefPts {
    fn from(indices: Vec<usize>) -> Self {
        RefPts::Indices(indices)
    }
}
