//! Linear, momentum-dependent element maps.
//!
//! Coordinates are `(x, px, y, py, delta, ct)` with `px = p_x / p0`. Every
//! map is paraxial; focusing scales with `1 / (1 + delta)`.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use twiss_core::{ErrorInfo, Orbit, OpticsError, SegmentClass, SegmentInfo, SPEED_OF_LIGHT};

fn element_error(code: &str, message: impl Into<String>) -> OpticsError {
    OpticsError::Lattice(ErrorInfo::new(code, message))
}

/// A single lattice element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Element {
    /// Zero-length marker.
    Marker,
    /// Field-free drift.
    Drift {
        /// Length [m].
        length: f64,
    },
    /// Thick normal quadrupole, focusing horizontally for `k > 0`.
    Quadrupole {
        /// Length [m].
        length: f64,
        /// Gradient [m^-2].
        k: f64,
    },
    /// Sector bend with weak focusing.
    Dipole {
        /// Length [m].
        length: f64,
        /// Bending angle [rad].
        angle: f64,
    },
    /// Thin skew quadrupole.
    SkewQuad {
        /// Integrated skew gradient [m^-1].
        ks: f64,
    },
    /// Sextupole modelled as a thin kick between two half drifts.
    Sextupole {
        /// Length [m].
        length: f64,
        /// Sextupole strength [m^-3].
        k2: f64,
    },
    /// RF cavity, a drift unless longitudinal motion is active.
    RfCavity {
        /// Length [m].
        length: f64,
        /// Peak voltage [V].
        voltage: f64,
        /// RF frequency [Hz].
        frequency: f64,
        /// Harmonic number.
        harmonic: f64,
    },
    /// Lumped synchrotron radiation loss, identity unless longitudinal motion is active.
    Radiator {
        /// Energy lost per passage by the reference particle [eV].
        energy_loss: f64,
    },
}

/// Ring-level quantities an element pass may need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContext {
    /// Beam energy [eV].
    pub energy: f64,
    /// Whether cavities and radiation act on the beam.
    pub longitudinal: bool,
}

impl Element {
    /// Element length [m].
    pub fn length(&self) -> f64 {
        match self {
            Element::Marker | Element::SkewQuad { .. } | Element::Radiator { .. } => 0.0,
            Element::Drift { length }
            | Element::Quadrupole { length, .. }
            | Element::Dipole { length, .. }
            | Element::Sextupole { length, .. }
            | Element::RfCavity { length, .. } => *length,
        }
    }

    /// Summary used by the optics engine.
    pub fn info(&self) -> SegmentInfo {
        let (class, strength) = match self {
            Element::Drift { .. } => (SegmentClass::Drift, 0.0),
            Element::Quadrupole { k, .. } => (SegmentClass::Quadrupole, *k),
            Element::Dipole { .. } => (SegmentClass::Dipole, 0.0),
            Element::SkewQuad { .. } => (SegmentClass::Quadrupole, 0.0),
            Element::Sextupole { .. } => (SegmentClass::Sextupole, 0.0),
            Element::RfCavity { .. } => (SegmentClass::Cavity, 0.0),
            Element::Marker | Element::Radiator { .. } => (SegmentClass::Other, 0.0),
        };
        SegmentInfo {
            length: self.length(),
            class,
            strength,
        }
    }

    /// Checks attribute ranges.
    pub fn validate(&self) -> Result<(), OpticsError> {
        if !(self.length() >= 0.0) {
            return Err(element_error("element-length", "element length must be non-negative"));
        }
        match self {
            Element::Dipole { length, angle } if *angle != 0.0 && *length == 0.0 => Err(
                element_error("dipole-length", "a bending dipole needs a positive length"),
            ),
            Element::RfCavity { frequency, harmonic, .. }
                if !(*frequency > 0.0) || !(*harmonic > 0.0) =>
            {
                Err(element_error(
                    "cavity-frequency",
                    "cavity frequency and harmonic number must be positive",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Tracks `r` through the element in place.
    pub fn pass(&self, r: &mut Orbit, ctx: &PassContext) {
        match *self {
            Element::Marker => {}
            Element::Drift { length } => drift(r, length),
            Element::Quadrupole { length, k } => {
                let p = 1.0 + r[4];
                let (x, px) = focus(r[0], r[1], k / p, length, p);
                let (y, py) = focus(r[2], r[3], -k / p, length, p);
                r[0] = x;
                r[1] = px;
                r[2] = y;
                r[3] = py;
            }
            Element::Dipole { length, angle } => {
                if angle == 0.0 {
                    drift(r, length);
                } else {
                    sector_bend(r, length, angle);
                }
            }
            Element::SkewQuad { ks } => {
                let p = 1.0 + r[4];
                let (x, y) = (r[0], r[2]);
                r[1] -= ks * y / p;
                r[3] -= ks * x / p;
            }
            Element::Sextupole { length, k2 } => {
                drift(r, 0.5 * length);
                let p = 1.0 + r[4];
                let (x, y) = (r[0], r[2]);
                r[1] -= 0.5 * k2 * length * (x * x - y * y) / p;
                r[3] += k2 * length * x * y / p;
                drift(r, 0.5 * length);
            }
            Element::RfCavity {
                length,
                voltage,
                frequency,
                ..
            } => {
                drift(r, 0.5 * length);
                if ctx.longitudinal {
                    r[4] -= voltage / ctx.energy * (TAU * frequency * r[5] / SPEED_OF_LIGHT).sin();
                }
                drift(r, 0.5 * length);
            }
            Element::Radiator { energy_loss } => {
                if ctx.longitudinal {
                    let u0 = energy_loss / ctx.energy;
                    let p = 1.0 + r[4];
                    r[1] *= 1.0 - u0 * p;
                    r[3] *= 1.0 - u0 * p;
                    r[4] -= u0 * p * p;
                }
            }
        }
    }
}

fn drift(r: &mut Orbit, length: f64) {
    let p = 1.0 + r[4];
    r[0] += length * r[1] / p;
    r[2] += length * r[3] / p;
    r[5] += 0.5 * length * (r[1] * r[1] + r[3] * r[3]) / (p * p);
}

/// Solves `x'' = -kk x` over `length`, with `x' = px / p`.
fn focus(x: f64, px: f64, kk: f64, length: f64, p: f64) -> (f64, f64) {
    if kk == 0.0 {
        return (x + length * px / p, px);
    }
    let w = kk.abs().sqrt();
    let phi = w * length;
    if kk > 0.0 {
        let (s, c) = phi.sin_cos();
        (x * c + px / (p * w) * s, -p * w * x * s + px * c)
    } else {
        let (s, c) = (phi.sinh(), phi.cosh());
        (x * c + px / (p * w) * s, p * w * x * s + px * c)
    }
}

fn sector_bend(r: &mut Orbit, length: f64, angle: f64) {
    let p = 1.0 + r[4];
    let h = angle / length;
    let w = h / p.sqrt();
    let phi = w * length;
    let (s, c) = phi.sin_cos();
    // off-momentum reference orbit of the bend
    let x0 = r[4] / h;
    let u = r[0] - x0;
    let px = r[1];
    r[0] = x0 + u * c + px / (p * w) * s;
    r[1] = -p * w * u * s + px * c;
    r[5] += h * (x0 * length + u * s / w + px / (p * w * w) * (1.0 - c));
    r[2] += length * r[3] / p;
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: PassContext = PassContext {
        energy: 1e9,
        longitudinal: false,
    };

    #[test]
    fn drift_moves_with_slope() {
        let mut r = [0.0, 1e-3, 0.0, -2e-3, 0.0, 0.0];
        Element::Drift { length: 2.0 }.pass(&mut r, &CTX);
        assert!((r[0] - 2e-3).abs() < 1e-15);
        assert!((r[2] + 4e-3).abs() < 1e-15);
    }

    #[test]
    fn zero_gradient_quadrupole_is_a_drift() {
        let mut a = [1e-3, 2e-4, -1e-3, 1e-4, 1e-3, 0.0];
        let mut b = a;
        Element::Quadrupole { length: 0.7, k: 0.0 }.pass(&mut a, &CTX);
        drift(&mut b, 0.7);
        assert!((a[0] - b[0]).abs() < 1e-15 && (a[2] - b[2]).abs() < 1e-15);
    }

    #[test]
    fn bend_keeps_off_momentum_reference_orbit() {
        let delta = 1e-3;
        let h = 0.1 / 1.5;
        let mut r = [delta / h, 0.0, 0.0, 0.0, delta, 0.0];
        Element::Dipole {
            length: 1.5,
            angle: 0.1,
        }
        .pass(&mut r, &CTX);
        assert!((r[0] - delta / h).abs() < 1e-14);
        assert!(r[1].abs() < 1e-14);
    }

    #[test]
    fn cavity_is_inactive_in_transverse_tracking() {
        let mut r = [0.0, 0.0, 0.0, 0.0, 0.0, 1e-3];
        Element::RfCavity {
            length: 0.0,
            voltage: 1e6,
            frequency: 3.5e8,
            harmonic: 100.0,
        }
        .pass(&mut r, &CTX);
        assert_eq!(r[4], 0.0);
    }

    #[test]
    fn invalid_cavity_is_rejected() {
        let cavity = Element::RfCavity {
            length: 0.0,
            voltage: 1e6,
            frequency: 0.0,
            harmonic: 100.0,
        };
        assert!(cavity.validate().is_err());
    }
}
