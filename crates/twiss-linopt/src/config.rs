use std::path::Path;

use serde::{Deserialize, Serialize};
use twiss_core::{ErrorInfo, OpticsError, Orbit, Tolerances};

use crate::serde::from_yaml_slice;

/// YAML-configurable options of a linear optics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinoptOpts {
    /// Central momentum deviation. Ignored in 6D, where it comes out of the orbit search.
    #[serde(default)]
    pub dp: f64,
    /// Finite-difference steps and orbit-search bounds.
    #[serde(default)]
    pub tolerances: Tolerances,
    /// Run the coupled (Edwards-Teng) analysis; `false` reads the diagonal blocks directly.
    #[serde(default = "default_coupled")]
    pub coupled: bool,
    /// Compute the chromaticity.
    #[serde(default)]
    pub get_chrom: bool,
    /// Compute the chromatic amplitude functions (implies the chromaticity).
    #[serde(default)]
    pub get_w: bool,
    /// Tell collaborators the lattice is unchanged since the previous call.
    #[serde(default)]
    pub keep_lattice: bool,
    /// Known entrance orbit; skips the closed-orbit search.
    #[serde(default)]
    pub orbit: Option<Orbit>,
}

fn default_coupled() -> bool {
    true
}

impl Default for LinoptOpts {
    fn default() -> Self {
        Self {
            dp: 0.0,
            tolerances: Tolerances::default(),
            coupled: default_coupled(),
            get_chrom: false,
            get_w: false,
            keep_lattice: false,
            orbit: None,
        }
    }
}

impl LinoptOpts {
    /// Parses options from YAML bytes.
    pub fn from_yaml_slice(data: &[u8]) -> Result<Self, OpticsError> {
        let opts: LinoptOpts = from_yaml_slice(data)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reads options from a YAML file.
    pub fn load(path: &Path) -> Result<Self, OpticsError> {
        let bytes = std::fs::read(path).map_err(|err| {
            OpticsError::Serde(
                ErrorInfo::new("config-read", err.to_string()).with_context("path", path.display()),
            )
        })?;
        Self::from_yaml_slice(&bytes)
    }

    /// Rejects non-positive steps.
    pub fn validate(&self) -> Result<(), OpticsError> {
        let tol = &self.tolerances;
        if !(tol.dp_step > 0.0) || !(tol.xy_step > 0.0) || !(tol.orbit_tolerance > 0.0) {
            return Err(OpticsError::Serde(
                ErrorInfo::new("config-tolerance", "tolerances must be positive")
                    .with_context("dp_step", tol.dp_step)
                    .with_context("xy_step", tol.xy_step)
                    .with_context("orbit_tolerance", tol.orbit_tolerance),
            ));
        }
        Ok(())
    }

    pub(crate) fn wants_chromaticity(&self) -> bool {
        self.get_chrom || self.get_w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let opts = LinoptOpts::from_yaml_slice(b"{}").unwrap();
        assert_eq!(opts, LinoptOpts::default());
        assert!(opts.coupled);
    }

    #[test]
    fn partial_tolerances_keep_other_defaults() {
        let yaml = b"get_w: true\ntolerances:\n  dp_step: 1.0e-5\n";
        let opts = LinoptOpts::from_yaml_slice(yaml).unwrap();
        assert!(opts.wants_chromaticity());
        assert_eq!(opts.tolerances.dp_step, 1e-5);
        assert_eq!(opts.tolerances.max_iterations, 20);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = LinoptOpts::from_yaml_slice(b"tolerances:\n  xy_step: 0.0\n").unwrap_err();
        assert_eq!(err.info().code, "config-tolerance");
    }
}
