//! Small helpers for comparing arrays and accepting dynamically shaped tensors.

use crate::types::{FactorScalar, FactorizeError, Result};
use ndarray::{ArrayBase, ArrayView2, ArrayViewD, Data, Ix2};
use ndarray_linalg::OperationNorm;

pub trait RelDiff {
    type A: FactorScalar;

    /// Return the relative Frobenius norm difference of `self` and `other`.
    fn rel_diff<S: Data<Elem = Self::A>>(&self, other: &ArrayBase<S, Ix2>) -> Result<Self::A>;
}

impl<A, S> RelDiff for ArrayBase<S, Ix2>
where
    A: FactorScalar,
    S: Data<Elem = A>,
{
    type A = A;

    fn rel_diff<S2: Data<Elem = A>>(&self, other: &ArrayBase<S2, Ix2>) -> Result<A> {
        let diff = self - other;

        Ok(diff.opnorm_fro()? / other.opnorm_fro()?)
    }
}

/// View a dynamically shaped tensor as a matrix.
///
/// Fails with [FactorizeError::ShapeMismatch] unless `arr` has exactly two axes.
pub fn as_matrix<'a, A>(arr: ArrayViewD<'a, A>) -> Result<ArrayView2<'a, A>> {
    let shape = arr.shape().to_vec();

    arr.into_dimensionality::<Ix2>().map_err(|_| {
        FactorizeError::ShapeMismatch(format!("expected a rank 2 tensor, got shape {:?}", shape))
    })
}
