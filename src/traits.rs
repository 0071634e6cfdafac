//! This module collects the various traits definitions

use crate::types::FactorScalar;
use ndarray::{Array2, ArrayView2};

/// Application of a linear operator to a batch of row samples.
///
/// For an operator mapping `input_dim` features to `output_dim` features,
/// `apply` takes a matrix of shape `[n, input_dim]` and returns `[n, output_dim]`.
pub trait Apply {
    type A: FactorScalar;

    /// Number of input features.
    fn input_dim(&self) -> usize;

    /// Number of output features.
    fn output_dim(&self) -> usize;

    /// Apply the operator to each row of `samples`.
    fn apply(&self, samples: ArrayView2<Self::A>) -> Array2<Self::A>;
}
