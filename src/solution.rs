//! The result of a low rank factorization.

use crate::traits::Apply;
use crate::types::{FactorScalar, Scalar};
use ndarray::{Array, Array1, Array2, ArrayView2, Dimension, Ix2};
use num::Zero;

/// Bundles the weights of a factorized linear operator.
///
/// The factorization splits an operator into two smaller operators. The first,
/// `wa`, embeds its input in a space of dimension `rank`; the second, `wb`, maps
/// this space to the original output space. For a factorized matrix both are
/// matrices; for a factorized convolution (`D = Ix4`) they are convolution
/// kernels, `wb` always with a 1x1 spatial extent.
///
/// A solution is built once per call and never mutated by this crate. The
/// weights are freshly allocated and owned by the caller.
#[derive(Clone, Debug)]
pub struct LowRankSolution<A: Scalar, D: Dimension = Ix2> {
    /// First stage of the operator.
    pub wa: Array<A, D>,
    /// Second stage of the operator. `None` if `wa` alone is the full operator.
    pub wb: Option<Array<A, D>>,
    /// Vector added to the output of the last stage.
    pub bias: Option<Array1<A>>,
    /// Output dimensionality of `wa`, or `None` if no factorization was
    /// performed and the weights describe the operator as it was passed in
    /// (or as its exact least squares fit).
    pub rank: Option<usize>,
    /// Normalized mean squared error reached by the alternating least squares
    /// iteration. 0 means the original output is reproduced exactly, 1 means
    /// it is captured no better than chance. Left at 0 if `rank` is `None`.
    pub nmse: A,
}

impl<A: FactorScalar, D: Dimension> LowRankSolution<A, D> {
    /// A solution that leaves the operator unfactorized.
    pub(crate) fn unfactorized(wa: Array<A, D>, wb: Option<Array<A, D>>, bias: Option<Array1<A>>) -> Self {
        LowRankSolution {
            wa,
            wb,
            bias,
            rank: None,
            nmse: A::zero(),
        }
    }

    pub(crate) fn factorized(
        wa: Array<A, D>,
        wb: Array<A, D>,
        bias: Array1<A>,
        rank: usize,
        nmse: A,
    ) -> Self {
        LowRankSolution {
            wa,
            wb: Some(wb),
            bias: Some(bias),
            rank: Some(rank),
            nmse,
        }
    }

    pub fn is_factorized(&self) -> bool {
        self.rank.is_some()
    }

    /// Total number of weight and bias entries.
    pub fn num_params(&self) -> usize {
        self.wa.len()
            + self.wb.as_ref().map_or(0, |wb| wb.len())
            + self.bias.as_ref().map_or(0, |bias| bias.len())
    }
}

impl<A: FactorScalar> LowRankSolution<A> {
    /// The matrix `wa @ wb`, or `wa` for a single stage solution.
    pub fn to_mat(&self) -> Array2<A> {
        match &self.wb {
            Some(wb) => self.wa.dot(wb),
            None => self.wa.clone(),
        }
    }
}

impl<A: FactorScalar> Apply for LowRankSolution<A> {
    type A = A;

    fn input_dim(&self) -> usize {
        self.wa.nrows()
    }

    fn output_dim(&self) -> usize {
        match &self.wb {
            Some(wb) => wb.ncols(),
            None => self.wa.ncols(),
        }
    }

    fn apply(&self, samples: ArrayView2<A>) -> Array2<A> {
        let mut output = samples.dot(&self.wa);
        if let Some(wb) = &self.wb {
            output = output.dot(wb);
        }
        if let Some(bias) = &self.bias {
            output += bias;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn test_apply_and_to_mat() {
        let solution = LowRankSolution::factorized(
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            array![[2.0, 0.0], [0.0, 3.0]],
            array![0.5, -0.5],
            2,
            0.0,
        );

        let x = array![[1.0, 2.0, 3.0]];
        assert_eq!(solution.apply(x.view()), array![[8.5, 14.5]]);
        assert_eq!(solution.to_mat(), array![[2.0, 0.0], [0.0, 3.0], [2.0, 3.0]]);
        assert_eq!(solution.input_dim(), 3);
        assert_eq!(solution.output_dim(), 2);
        assert_eq!(solution.num_params(), 6 + 4 + 2);
    }

    #[test]
    fn test_unfactorized_defaults() {
        let solution =
            LowRankSolution::<f32, _>::unfactorized(Array4::<f32>::zeros((4, 3, 3, 3)), None, None);

        assert!(!solution.is_factorized());
        assert_eq!(solution.nmse, 0.0);
        assert_eq!(solution.num_params(), 108);
    }
}
