//! 2x2 block algebra shared by the decomposition and the propagation.

use nalgebra::{DMatrix, Matrix2};
use twiss_core::{ErrorInfo, OpticsError};

/// The 2x2 symplectic unit `[[0, 1], [-1, 0]]`.
pub fn jmat() -> Matrix2<f64> {
    Matrix2::new(0.0, 1.0, -1.0, 0.0)
}

/// Symplectic conjugate `J C^T J^T`, the inverse of a unit-determinant block.
pub fn symplectic_conjugate(c: &Matrix2<f64>) -> Matrix2<f64> {
    let j = jmat();
    j * c.transpose() * j.transpose()
}

/// Sign with `sign(0) = 0`.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Upper-left, lower-right, upper-right and lower-left 2x2 blocks of the
/// transverse part of a transfer matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blocks {
    /// Horizontal block.
    pub mm: Matrix2<f64>,
    /// Vertical block.
    pub nn: Matrix2<f64>,
    /// Vertical-to-horizontal coupling.
    pub m: Matrix2<f64>,
    /// Horizontal-to-vertical coupling.
    pub n: Matrix2<f64>,
}

impl Blocks {
    /// Splits the leading 4x4 part of `t`.
    pub fn split(t: &DMatrix<f64>) -> Result<Self, OpticsError> {
        if t.nrows() < 4 || t.ncols() < 4 {
            return Err(OpticsError::DimensionMismatch(
                ErrorInfo::new("matrix-shape", "transfer matrix smaller than 4x4")
                    .with_context("rows", t.nrows())
                    .with_context("cols", t.ncols()),
            ));
        }
        Ok(Self {
            mm: t.fixed_view::<2, 2>(0, 0).into_owned(),
            nn: t.fixed_view::<2, 2>(2, 2).into_owned(),
            m: t.fixed_view::<2, 2>(0, 2).into_owned(),
            n: t.fixed_view::<2, 2>(2, 0).into_owned(),
        })
    }
}

/// Converts a block into row-major nested arrays.
pub fn to_rows(block: &Matrix2<f64>) -> [[f64; 2]; 2] {
    [
        [block[(0, 0)], block[(0, 1)]],
        [block[(1, 0)], block[(1, 1)]],
    ]
}

/// Requires a square matrix of side `dim`.
pub(crate) fn check_square(t: &DMatrix<f64>, dim: usize, what: &str) -> Result<(), OpticsError> {
    if t.nrows() == dim && t.ncols() == dim {
        Ok(())
    } else {
        Err(OpticsError::DimensionMismatch(
            ErrorInfo::new("matrix-shape", format!("{what} has the wrong shape"))
                .with_context("expected", dim)
                .with_context("rows", t.nrows())
                .with_context("cols", t.ncols()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjugate_inverts_unit_blocks() {
        let c = Matrix2::new(2.0, 1.0, 3.0, 2.0);
        let product = c * symplectic_conjugate(&c);
        assert!((product - Matrix2::identity()).amax() < 1e-15);
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
    }

    #[test]
    fn split_reads_row_major_blocks() {
        let t = DMatrix::from_fn(4, 4, |i, j| (4 * i + j) as f64);
        let blocks = Blocks::split(&t).unwrap();
        assert_eq!(blocks.m, Matrix2::new(2.0, 3.0, 6.0, 7.0));
        assert_eq!(blocks.n, Matrix2::new(8.0, 9.0, 12.0, 13.0));
    }
}
