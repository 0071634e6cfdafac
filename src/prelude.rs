//! Collect all traits and other exports here.

pub use crate::conv2d::{
    activations_to_matrix, factorize_conv2d, matrix_to_weights, pad_activations,
    weights_to_matrix, Conv2dParams, PaddingMode,
};
pub use crate::factorize::{factorize_matrix, FactorizeOptions};
pub use crate::helpers::{as_matrix, RelDiff};
pub use crate::lstsq::{lstsq, nmse};
pub use crate::operator::Operator;
pub use crate::random_matrix::RandomMatrix;
pub use crate::solution::LowRankSolution;
pub use crate::svd::SVDData;
pub use crate::traits::Apply;
pub use crate::types::{FactorScalar, FactorizeError, Result};
pub use crate::RankSpec;
