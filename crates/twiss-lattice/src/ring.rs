use std::path::Path;

use serde::{Deserialize, Serialize};
use twiss_core::{
    ErrorInfo, Lattice, Mode, OpticsError, Orbit, RfControl, SegmentInfo, SPEED_OF_LIGHT,
};

use crate::element::{Element, PassContext};

fn ring_error(code: &str, message: impl Into<String>) -> OpticsError {
    OpticsError::Lattice(ErrorInfo::new(code, message))
}

fn serde_error(code: &str, err: impl ToString) -> OpticsError {
    OpticsError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn default_energy() -> f64 {
    1e9
}

/// Ordered sequence of elements with ring-level parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    /// Elements in beam order.
    pub elements: Vec<Element>,
    /// Beam energy [eV].
    #[serde(default = "default_energy")]
    pub energy: f64,
    /// Whether cavities and radiation are active (6D optics).
    #[serde(default)]
    pub radiation: bool,
}

impl Ring {
    /// Builds a validated ring.
    pub fn new(elements: Vec<Element>, energy: f64) -> Result<Self, OpticsError> {
        let ring = Self {
            elements,
            energy,
            radiation: false,
        };
        ring.validate()?;
        Ok(ring)
    }

    /// Verifies the ring-level and per-element attributes.
    pub fn validate(&self) -> Result<(), OpticsError> {
        if !(self.energy > 0.0) {
            return Err(ring_error("ring-energy", "beam energy must be positive"));
        }
        for (index, element) in self.elements.iter().enumerate() {
            element.validate().map_err(|err| match err {
                OpticsError::Lattice(info) => OpticsError::Lattice(info.with_context("index", index)),
                other => other,
            })?;
        }
        Ok(())
    }

    /// Parses and validates a ring from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, OpticsError> {
        let ring: Ring = serde_yaml::from_str(text).map_err(|err| serde_error("ring-yaml", err))?;
        ring.validate()?;
        Ok(ring)
    }

    /// Parses and validates a ring from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, OpticsError> {
        let ring: Ring = serde_json::from_str(text).map_err(|err| serde_error("ring-json", err))?;
        ring.validate()?;
        Ok(ring)
    }

    /// Loads a ring description, choosing the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, OpticsError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            OpticsError::Serde(
                ErrorInfo::new("ring-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Returns a copy with cavities and radiation switched on.
    pub fn radiation_on(&self) -> Self {
        Self {
            radiation: true,
            ..self.clone()
        }
    }

    /// Returns a copy with cavities and radiation switched off.
    pub fn radiation_off(&self) -> Self {
        Self {
            radiation: false,
            ..self.clone()
        }
    }

    /// Total length [m].
    pub fn length(&self) -> f64 {
        self.elements.iter().map(Element::length).sum()
    }

    fn context(&self, mode: Mode) -> PassContext {
        PassContext {
            energy: self.energy,
            longitudinal: mode == Mode::Mode6D,
        }
    }

    /// Tracks one particle through the whole ring.
    pub fn track(&self, r0: &Orbit, mode: Mode) -> Orbit {
        let ctx = self.context(mode);
        let mut r = *r0;
        for element in &self.elements {
            element.pass(&mut r, &ctx);
        }
        r
    }

    /// Tracks one particle and records it at the entrance of each of `refpts`.
    ///
    /// `refpts` must be strictly increasing and at most the element count.
    pub fn track_refpts(&self, r0: &Orbit, refpts: &[usize], mode: Mode) -> (Orbit, Vec<Orbit>) {
        let ctx = self.context(mode);
        let mut r = *r0;
        let mut recorded = Vec::with_capacity(refpts.len());
        let mut pending = refpts.iter().peekable();
        for (index, element) in self.elements.iter().enumerate() {
            while pending.next_if(|&&idx| idx == index).is_some() {
                recorded.push(r);
            }
            element.pass(&mut r, &ctx);
        }
        if pending.next_if(|&&idx| idx == self.elements.len()).is_some() {
            recorded.push(r);
        }
        (r, recorded)
    }

    pub(crate) fn check_refpts(&self, refpts: &[usize]) -> Result<(), OpticsError> {
        let ordered = refpts.windows(2).all(|pair| pair[0] < pair[1]);
        let in_range = refpts.iter().all(|&idx| idx <= self.elements.len());
        if ordered && in_range {
            Ok(())
        } else {
            Err(OpticsError::DimensionMismatch(
                ErrorInfo::new(
                    "ring-refpts",
                    "reference points must be increasing and within the ring",
                )
                .with_context("elements", self.elements.len()),
            ))
        }
    }

    fn first_cavity(&self) -> Option<(f64, f64)> {
        self.elements.iter().find_map(|element| match element {
            Element::RfCavity {
                frequency,
                harmonic,
                ..
            } => Some((*frequency, *harmonic)),
            _ => None,
        })
    }

    /// Path-length offset per turn imposed by the RF frequency, `c h / f - L`.
    pub fn rf_path_offset(&self) -> Result<f64, OpticsError> {
        let (frequency, harmonic) = self.first_cavity().ok_or_else(|| {
            OpticsError::Lattice(
                ErrorInfo::new("rf-missing", "6D orbit search needs an RF cavity")
                    .with_hint("add an rf-cavity element or switch radiation off"),
            )
        })?;
        Ok(SPEED_OF_LIGHT * harmonic / frequency - self.length())
    }
}

impl Lattice for Ring {
    fn segment_count(&self) -> usize {
        self.elements.len()
    }

    fn segment(&self, index: usize) -> Result<SegmentInfo, OpticsError> {
        self.elements
            .get(index)
            .map(Element::info)
            .ok_or_else(|| {
                OpticsError::DimensionMismatch(
                    ErrorInfo::new("segment-index", "segment index out of range")
                        .with_context("index", index),
                )
            })
    }

    fn is_radiating(&self) -> bool {
        self.radiation
    }
}

impl RfControl for Ring {
    fn rf_frequency(&self) -> Result<f64, OpticsError> {
        self.first_cavity()
            .map(|(frequency, _)| frequency)
            .ok_or_else(|| ring_error("rf-missing", "the ring has no RF cavity"))
    }

    fn with_rf_frequency(&self, frequency: f64) -> Result<Self, OpticsError> {
        if !(frequency > 0.0) {
            return Err(ring_error("rf-frequency", "RF frequency must be positive"));
        }
        self.rf_frequency()?;
        let elements = self
            .elements
            .iter()
            .map(|element| match element {
                Element::RfCavity {
                    length,
                    voltage,
                    harmonic,
                    ..
                } => Element::RfCavity {
                    length: *length,
                    voltage: *voltage,
                    frequency,
                    harmonic: *harmonic,
                },
                other => other.clone(),
            })
            .collect();
        Ok(Self {
            elements,
            ..self.clone()
        })
    }
}
