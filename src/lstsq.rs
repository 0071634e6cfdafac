//! Least squares solves and the normalized reconstruction error.
//!
//! Given a design matrix $A\in\mathbb{R}^{n\times d}$ and targets
//! $B\in\mathbb{R}^{n\times m}$, [lstsq] returns the matrix $X$ minimizing
//! $\\|AX - B\\|_F$. The solve is delegated to LAPACK's gelsd, so rank deficient
//! design matrices yield the minimum norm solution. No further regularization
//! is applied; LAPACK failures surface as [FactorizeError::LinalgError].

use crate::types::{FactorScalar, FactorizeError, Result, Scalar};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use ndarray_linalg::LeastSquaresSvdInto;
use num::Zero;

/// Solve the least squares problem $\min_X \\|AX - B\\|_F$.
///
/// Fails with [FactorizeError::ShapeMismatch] if `a` and `b` have a different
/// number of rows.
pub fn lstsq<A, S1, S2>(a: &ArrayBase<S1, Ix2>, b: &ArrayBase<S2, Ix2>) -> Result<Array2<A>>
where
    A: FactorScalar,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    if a.nrows() != b.nrows() {
        return Err(FactorizeError::ShapeMismatch(format!(
            "A has different number of rows than B: A.shape = {:?}, B.shape = {:?}",
            a.shape(),
            b.shape()
        )));
    }

    // gelsd overwrites both operands, so hand it row major copies.
    let a = a.as_standard_layout().into_owned();
    let b = b.as_standard_layout().into_owned();
    let result = a.least_squares_into(b)?;

    Ok(result.solution)
}

/// Mean of the squared elementwise residual divided by the variance of `y`.
///
/// The variance is the unbiased estimate over all elements of `y`. A value of
/// 0 means `y_hat` reproduces `y` exactly, a value of 1 means `y_hat` does no
/// better than predicting the mean.
pub fn nmse<A, S1, S2>(y: &ArrayBase<S1, Ix2>, y_hat: &ArrayBase<S2, Ix2>) -> Result<A>
where
    A: FactorScalar,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    if y.shape() != y_hat.shape() {
        return Err(FactorizeError::ShapeMismatch(format!(
            "reference has shape {:?} but approximation has shape {:?}",
            y.shape(),
            y_hat.shape()
        )));
    }
    let mse = (y - y_hat).mapv(|d| d * d).mean().ok_or_else(|| {
        FactorizeError::ShapeMismatch("cannot compute error of an empty array".to_string())
    })?;

    Ok(mse / variance(y))
}

fn variance<A, S>(y: &ArrayBase<S, Ix2>) -> A
where
    A: FactorScalar,
    S: Data<Elem = A>,
{
    let n = y.len();
    let mean = y.mean().unwrap_or_else(A::zero);
    let dof = if n > 1 { n - 1 } else { 1 };

    y.mapv(|v| (v - mean) * (v - mean)).sum() / <A as Scalar>::real(dof)
}
