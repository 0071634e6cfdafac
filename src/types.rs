//! Error type, result alias and the scalar trait shared by all routines.

use ndarray::ScalarOperand;
use ndarray_linalg::error::LinalgError;
use ndarray_linalg::Lapack;
use thiserror::Error;

pub use ndarray_linalg::Scalar;

#[derive(Error, Debug)]
pub enum FactorizeError {
    #[error("Lapack Error: {0}")]
    LinalgError(#[from] LinalgError),
    #[error("SVD computation did not return singular vectors")]
    SvdError,
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Unsupported convolution configuration: {0}")]
    UnsupportedConfiguration(String),
    #[error("Inconsistent arguments: {0}")]
    InconsistentArguments(String),
    #[error("Invalid rank: {0}")]
    InvalidRank(String),
}

pub type Result<T> = std::result::Result<T, FactorizeError>;

/// Real scalar types supported by the factorization routines.
///
/// The alternating least squares updates transpose rather than conjugate
/// transpose their factors, so only real LAPACK types implement this trait.
pub trait FactorScalar: Scalar<Real = Self> + Lapack + ScalarOperand {}

macro_rules! factor_scalar_impl {
    ($scalar:ty) => {
        impl FactorScalar for $scalar {}
    };
}

factor_scalar_impl!(f32);
factor_scalar_impl!(f64);
