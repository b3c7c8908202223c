//! Matrix types returned by the operator builders.

use itertools::izip;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{sparse, MeshError, MeshResult};

/// A diagonal matrix, such as an inner-product matrix.
///
/// Stored as its diagonal vector and converted to CSR on request.
#[derive(Clone, Debug)]
pub struct DiagonalMatrix {
    // a diagonal vector is a more efficient form of storage than a CSR matrix.
    // this is converted to a matrix upon composition with other operators
    diagonal: na::DVector<f64>,
}

impl DiagonalMatrix {
    /// The diagonal entries.
    #[inline]
    pub fn diagonal(&self) -> &na::DVector<f64> {
        &self.diagonal
    }

    /// Number of rows (equal to the number of columns).
    #[inline]
    pub fn size(&self) -> usize {
        self.diagonal.len()
    }

    /// Multiply a vector with this matrix.
    pub fn apply(&self, input: &na::DVector<f64>) -> na::DVector<f64> {
        na::DVector::from_iterator(
            input.len(),
            izip!(self.diagonal.iter(), input.iter()).map(|(&diag_val, &in_val)| diag_val * in_val),
        )
    }

    /// Invert every nonzero diagonal entry, leaving zeros in place.
    ///
    /// Zero entries come from mesh components excluded from an operator
    /// (e.g. the azimuthal faces of an axisymmetric mesh),
    /// so the result is the inverse on the nonzero support.
    pub fn inverse(&self) -> Self {
        Self::from(self.diagonal.map(|d| if d == 0.0 { 0.0 } else { d.recip() }))
    }

    /// Convert into a general CSR matrix.
    pub fn into_csr(self) -> nas::CsrMatrix<f64> {
        sparse::sdiag(&self.diagonal)
    }
}

impl From<na::DVector<f64>> for DiagonalMatrix {
    fn from(diagonal: na::DVector<f64>) -> Self {
        Self { diagonal }
    }
}

impl PartialEq for DiagonalMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.diagonal == other.diagonal
    }
}

impl std::ops::Mul<&na::DVector<f64>> for &DiagonalMatrix {
    type Output = na::DVector<f64>;

    fn mul(self, rhs: &na::DVector<f64>) -> Self::Output {
        self.apply(rhs)
    }
}

impl std::ops::Mul<&DiagonalMatrix> for &DiagonalMatrix {
    type Output = DiagonalMatrix;

    fn mul(self, rhs: &DiagonalMatrix) -> Self::Output {
        DiagonalMatrix::from(self.diagonal.component_mul(&rhs.diagonal))
    }
}

/// The derivative of an inner-product matrix `M(p)` with respect to its property `p`.
///
/// Since `M` is diagonal, `d(M u)/dp` for a fixed vector `u`
/// equals `diag(u) * D` where `D` is the Jacobian of `diag(M)`,
/// which is what [`times`][Self::times] computes.
#[derive(Clone, Debug, PartialEq)]
pub struct InnerProductDerivative {
    // Jacobian of the diagonal of M, (n_elements, property length)
    mat: nas::CsrMatrix<f64>,
}

impl InnerProductDerivative {
    pub(crate) fn new(mat: nas::CsrMatrix<f64>) -> Self {
        Self { mat }
    }

    /// The Jacobian of the diagonal of the inner-product matrix.
    #[inline]
    pub fn matrix(&self) -> &nas::CsrMatrix<f64> {
        &self.mat
    }

    /// `d(M u)/dp`, a sparse matrix of shape `(u.len(), property length)`.
    ///
    /// Fails with [`MeshError::Shape`] if `u` doesn't have
    /// one entry per row of the inner-product matrix.
    pub fn times(&self, u: &na::DVector<f64>) -> MeshResult<nas::CsrMatrix<f64>> {
        if u.len() != self.mat.nrows() {
            return Err(MeshError::Shape(format!(
                "vector of length {} given to an inner-product derivative with {} rows",
                u.len(),
                self.mat.nrows()
            )));
        }
        let mut ret = self.mat.clone();
        for (row_idx, mut row) in ret.row_iter_mut().enumerate() {
            for val in row.values_mut() {
                *val *= u[row_idx];
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::to_dense;

    #[test]
    fn diagonal_inverse_skips_zeros() {
        let mat = DiagonalMatrix::from(na::DVector::from_vec(vec![2.0, 0.0, 4.0]));
        let inv = mat.inverse();
        assert_eq!(inv.diagonal().as_slice(), &[0.5, 0.0, 0.25]);
        let prod = &mat * &inv;
        assert_eq!(prod.diagonal().as_slice(), &[1.0, 0.0, 1.0]);
        assert_eq!(
            &mat * &na::DVector::from_element(3, 1.0),
            na::DVector::from_vec(vec![2.0, 0.0, 4.0])
        );
        assert_eq!(to_dense(&mat.into_csr())[(2, 2)], 4.0);
    }

    #[test]
    fn derivative_times_scales_rows() {
        let mut coo = nas::CooMatrix::new(2, 3);
        coo.push(0, 0, 1.0);
        coo.push(0, 2, 2.0);
        coo.push(1, 1, 3.0);
        let deriv = InnerProductDerivative::new(nas::CsrMatrix::from(&coo));
        let scaled = to_dense(&deriv.times(&na::DVector::from_vec(vec![2.0, -1.0])).unwrap());
        assert_eq!(
            scaled,
            na::DMatrix::from_row_slice(2, 3, &[2.0, 0.0, 4.0, 0.0, -3.0, 0.0])
        );
        assert!(deriv.times(&na::DVector::zeros(3)).is_err());
    }
}
