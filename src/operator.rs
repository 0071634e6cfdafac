//! Dense and already factorized linear operators.
//!
//! An operator maps row samples with $d$ features to $m$ features. It is
//! either a single matrix $W\in\mathbb{R}^{d\times m}$ or a pair
//! $W_a\in\mathbb{R}^{d\times r}$, $W_b\in\mathbb{R}^{r\times m}$ representing
//! $W = W_aW_b$. The factorized form allows the rank of an operator to be
//! decreased progressively by repeated factorization.

use crate::traits::Apply;
use crate::types::{FactorScalar, FactorizeError, Result};
use ndarray::{Array2, ArrayView2};
use std::borrow::Cow;

#[derive(Clone, Debug, PartialEq)]
pub enum Operator<A> {
    /// A single matrix of shape `[d, m]`.
    Dense(Array2<A>),
    /// A pair of matrices of shape `[d, r]` and `[r, m]`.
    Factorized(Array2<A>, Array2<A>),
}

impl<A: FactorScalar> Operator<A> {
    pub fn dense(w: Array2<A>) -> Self {
        Operator::Dense(w)
    }

    /// Create a factorized operator, checking that the inner dimensions agree.
    pub fn factorized(wa: Array2<A>, wb: Array2<A>) -> Result<Self> {
        if wa.ncols() != wb.nrows() {
            return Err(FactorizeError::ShapeMismatch(format!(
                "factors have incompatible inner dimensions: Wa.shape = {:?}, Wb.shape = {:?}",
                wa.shape(),
                wb.shape()
            )));
        }
        Ok(Operator::Factorized(wa, wb))
    }

    /// Create an operator from a first matrix and an optional second stage.
    pub fn from_parts(wa: Array2<A>, wb: Option<Array2<A>>) -> Result<Self> {
        match wb {
            Some(wb) => Self::factorized(wa, wb),
            None => Ok(Self::dense(wa)),
        }
    }

    /// Current intermediate dimensionality.
    ///
    /// For a dense operator this is its number of output features.
    pub fn inner_dim(&self) -> usize {
        match self {
            Operator::Dense(w) => w.ncols(),
            Operator::Factorized(wa, _) => wa.ncols(),
        }
    }

    pub fn is_factorized(&self) -> bool {
        matches!(self, Operator::Factorized(..))
    }

    /// The matrix represented by the operator.
    pub fn to_mat(&self) -> Cow<Array2<A>> {
        match self {
            Operator::Dense(w) => Cow::Borrowed(w),
            Operator::Factorized(wa, wb) => Cow::Owned(wa.dot(wb)),
        }
    }

    pub fn into_parts(self) -> (Array2<A>, Option<Array2<A>>) {
        match self {
            Operator::Dense(w) => (w, None),
            Operator::Factorized(wa, wb) => (wa, Some(wb)),
        }
    }
}

impl<A: FactorScalar> Apply for Operator<A> {
    type A = A;

    fn input_dim(&self) -> usize {
        match self {
            Operator::Dense(w) => w.nrows(),
            Operator::Factorized(wa, _) => wa.nrows(),
        }
    }

    fn output_dim(&self) -> usize {
        match self {
            Operator::Dense(w) => w.ncols(),
            Operator::Factorized(_, wb) => wb.ncols(),
        }
    }

    fn apply(&self, samples: ArrayView2<A>) -> Array2<A> {
        match self {
            Operator::Dense(w) => samples.dot(w),
            Operator::Factorized(wa, wb) => samples.dot(wa).dot(wb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dense_operator_dims() {
        let op = Operator::dense(Array2::<f64>::zeros((8, 4)));

        assert_eq!(op.input_dim(), 8);
        assert_eq!(op.output_dim(), 4);
        assert_eq!(op.inner_dim(), 4);
        assert!(!op.is_factorized());
    }

    #[test]
    fn test_factorized_operator_dims_and_product() {
        let wa = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let wb = array![[1.0, 2.0, 3.0, 4.0], [0.5, 0.0, 0.5, 0.0]];
        let op = Operator::factorized(wa.clone(), wb.clone()).unwrap();

        assert_eq!(op.input_dim(), 3);
        assert_eq!(op.output_dim(), 4);
        assert_eq!(op.inner_dim(), 2);
        assert_eq!(*op.to_mat(), wa.dot(&wb));

        let x = array![[1.0, 1.0, 1.0]];
        assert_eq!(op.apply(x.view()), x.dot(&wa).dot(&wb));
    }

    #[test]
    fn test_factorized_inner_dim_mismatch() {
        let result = Operator::factorized(Array2::<f32>::zeros((3, 2)), Array2::<f32>::zeros((3, 4)));

        assert!(matches!(result, Err(FactorizeError::ShapeMismatch(_))));
    }

    #[test]
    fn test_into_parts_round_trip() {
        let wa = Array2::<f64>::ones((3, 2));
        let wb = Array2::<f64>::ones((2, 5));

        let (a, b) = Operator::from_parts(wa.clone(), Some(wb.clone())).unwrap().into_parts();
        assert_eq!(a, wa);
        assert_eq!(b, Some(wb));

        let (a, b) = Operator::from_parts(wa.clone(), None).unwrap().into_parts();
        assert_eq!(a, wa);
        assert!(b.is_none());
    }
}
