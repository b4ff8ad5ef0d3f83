use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use twiss_core::{ErrorInfo, OpticsError};

fn shape_error(field: &str, expected: usize, found: usize) -> OpticsError {
    OpticsError::DimensionMismatch(
        ErrorInfo::new("twiss-in-shape", format!("initial twiss field `{field}` has the wrong length"))
            .with_context("field", field)
            .with_context("expected", expected)
            .with_context("found", found),
    )
}

/// Entrance optics of an open transfer line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwissInput {
    /// Alpha per transverse plane.
    #[serde(default)]
    pub alpha: Vec<f64>,
    /// Beta per transverse plane.
    #[serde(default)]
    pub beta: Vec<f64>,
    /// Entrance dispersion `(Dx, Dx', Dy, Dy')`.
    #[serde(default)]
    pub dispersion: Option<Vec<f64>>,
    /// 4x4 beam covariance; takes precedence over `alpha` and `beta`.
    #[serde(default)]
    pub covariance: Option<Vec<Vec<f64>>>,
}

/// Validated entrance conditions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineStart {
    /// Analysis matrix `sigma J`.
    pub mxx: DMatrix<f64>,
    /// Entrance dispersion.
    pub dispersion: [f64; 4],
}

impl TwissInput {
    /// Uncoupled entrance optics from per-plane alpha and beta.
    pub fn uncoupled(alpha: [f64; 2], beta: [f64; 2]) -> Self {
        Self {
            alpha: alpha.to_vec(),
            beta: beta.to_vec(),
            dispersion: None,
            covariance: None,
        }
    }

    /// Sets the entrance dispersion.
    pub fn with_dispersion(mut self, dispersion: [f64; 4]) -> Self {
        self.dispersion = Some(dispersion.to_vec());
        self
    }

    /// Covariance matrix: the supplied one, or block diagonal Twiss ellipses.
    pub fn sigma(&self) -> Result<DMatrix<f64>, OpticsError> {
        if let Some(rows) = &self.covariance {
            if rows.len() != 4 {
                return Err(shape_error("covariance", 4, rows.len()));
            }
            if let Some(bad) = rows.iter().find(|row| row.len() != 4) {
                return Err(shape_error("covariance", 4, bad.len()));
            }
            return Ok(DMatrix::from_fn(4, 4, |i, j| rows[i][j]));
        }
        if self.alpha.len() != 2 {
            return Err(shape_error("alpha", 2, self.alpha.len()));
        }
        if self.beta.len() != 2 {
            return Err(shape_error("beta", 2, self.beta.len()));
        }
        let mut sigma = DMatrix::zeros(4, 4);
        for plane in 0..2 {
            let (alpha, beta) = (self.alpha[plane], self.beta[plane]);
            if !(beta > 0.0) {
                return Err(OpticsError::DimensionMismatch(
                    ErrorInfo::new("twiss-in-beta", "initial beta must be positive")
                        .with_context("plane", plane)
                        .with_context("beta", beta),
                ));
            }
            let k = 2 * plane;
            sigma[(k, k)] = beta;
            sigma[(k, k + 1)] = -alpha;
            sigma[(k + 1, k)] = -alpha;
            sigma[(k + 1, k + 1)] = (1.0 + alpha * alpha) / beta;
        }
        Ok(sigma)
    }

    pub(crate) fn start(&self) -> Result<LineStart, OpticsError> {
        let sigma = self.sigma()?;
        let dispersion = match &self.dispersion {
            Some(values) if values.len() == 4 => [values[0], values[1], values[2], values[3]],
            Some(values) => return Err(shape_error("dispersion", 4, values.len())),
            None => {
                tracing::warn!("initial twiss has no dispersion, assuming zero");
                [0.0; 4]
            }
        };
        let mut j4 = DMatrix::zeros(4, 4);
        for k in [0, 2] {
            j4[(k, k + 1)] = 1.0;
            j4[(k + 1, k)] = -1.0;
        }
        Ok(LineStart {
            mxx: sigma * j4,
            dispersion,
        })
    }
}
