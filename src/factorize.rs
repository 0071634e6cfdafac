//! Low rank factorization of a matrix by alternating least squares.
//!
//! Given samples $X\in\mathbb{R}^{n\times d}$ and outputs
//! $Y = XW + b\in\mathbb{R}^{n\times m}$ of an operator $W$ (dense, or already
//! factorized as $W_aW_b$), we seek $W_a\in\mathbb{R}^{d\times k}$ and
//! $W_b\in\mathbb{R}^{k\times m}$ minimizing $\\|XW_aW_b - (Y - b)\\|_F$.
//!
//! The factors are initialized from the truncated SVD of $W$ and refined by
//! alternately solving for $W_b$ with $W_a$ fixed and for $W_a$ with $W_b$
//! fixed. The $W_a$ update uses the unconstrained solution $Y_a = X^+Y$:
//! since $X^+XW_aW_b = X^+Y$ reduces to $W_aW_b = Y_a$, we solve
//! $W_b^TW_a^T = Y_a^T$ for $W_a^T$ instead of refitting against $Y$.

use crate::lstsq::{lstsq, nmse};
use crate::operator::Operator;
use crate::solution::LowRankSolution;
use crate::svd::SVDData;
use crate::traits::Apply;
use crate::types::{FactorScalar, FactorizeError, Result};
use crate::RankSpec;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use tracing::{debug, trace};

/// Parameters of a factorization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FactorizeOptions {
    /// Target intermediate dimension.
    pub rank: RankSpec,
    /// Number of alternating least squares sweeps. More sweeps lower the
    /// error, with diminishing returns after a handful.
    pub n_iters: usize,
}

impl Default for FactorizeOptions {
    fn default() -> Self {
        FactorizeOptions {
            rank: RankSpec::Fraction(0.5),
            n_iters: 3,
        }
    }
}

impl FactorizeOptions {
    pub fn with_rank<R: Into<RankSpec>>(mut self, rank: R) -> Self {
        self.rank = rank.into();
        self
    }

    pub fn with_n_iters(mut self, n_iters: usize) -> Self {
        self.n_iters = n_iters;
        self
    }
}

/// Approximate an operator by the product of two smaller matrices.
///
/// # Arguments
///
/// * `x`: Input samples of shape `[n, d]`.
/// * `y`: Outputs of the original operator for `x`, of shape `[n, m]`.
/// * `op`: The operator to factorize, of shape `[d, m]` or as a pair
///         `[d, r]`, `[r, m]`.
/// * `bias`: Optional vector of length `m` contained in `y`. It is removed
///           before fitting and added back to the returned bias.
/// * `options`: Target rank and number of iterations.
///
/// If the resolved rank `k` is at least `d` or `m`, factorizing cannot save
/// anything; the returned solution holds the least squares fit of `y - bias`
/// on `x` as a single matrix. Otherwise, if `k` is at least the current rank of
/// `op`, the operator is returned unchanged. Both checks happen in this order.
/// In these cases the returned `rank` is `None`.
pub fn factorize_matrix<A: FactorScalar>(
    x: ArrayView2<A>,
    y: ArrayView2<A>,
    op: &Operator<A>,
    bias: Option<ArrayView1<A>>,
    options: &FactorizeOptions,
) -> Result<LowRankSolution<A>> {
    check_shapes(x, y, op, bias)?;

    let (d, m) = (x.ncols(), y.ncols());
    let k = options.rank.resolve(d, op.inner_dim())?;

    let original_bias = bias.map(|b| b.to_owned());
    let y = match &original_bias {
        Some(b) => &y - b,
        None => y.to_owned(),
    };

    if k >= d || k >= m {
        debug!(k, d, m, "rank not below input or output dimension, fitting a single matrix");
        let wa = lstsq(&x, &y)?;
        return Ok(LowRankSolution::unfactorized(wa, None, original_bias));
    }

    if k >= op.inner_dim() {
        debug!(k, current_rank = op.inner_dim(), "rank not below current rank, keeping operator");
        let (wa, wb) = op.clone().into_parts();
        return Ok(LowRankSolution::unfactorized(wa, wb, original_bias));
    }

    let (mut wa, mut wb) = SVDData::compute(&*op.to_mat())?
        .compress_rank(k)
        .into_balanced_factors();

    let ya = lstsq(&x, &y)?;
    for iter in 0..options.n_iters {
        wb = lstsq(&x.dot(&wa), &y)?;
        wa = lstsq(&wb.t(), &ya.t())?.reversed_axes();
        trace!(iter, "completed alternating least squares sweep");
    }

    let y_hat = x.dot(&wa).dot(&wb);
    let fitted_bias = (&y - &y_hat)
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(m));
    let nmse = nmse(&y, &(y_hat + &fitted_bias))?;

    let bias = match original_bias {
        Some(b) => fitted_bias + &b,
        None => fitted_bias,
    };

    debug!(k, nmse = ?nmse, n_iters = options.n_iters, "factorized operator");
    Ok(LowRankSolution::factorized(wa, wb, bias, k, nmse))
}

fn check_shapes<A: FactorScalar>(
    x: ArrayView2<A>,
    y: ArrayView2<A>,
    op: &Operator<A>,
    bias: Option<ArrayView1<A>>,
) -> Result<()> {
    if x.nrows() != y.nrows() {
        return Err(FactorizeError::ShapeMismatch(format!(
            "X and Y have different numbers of samples: X.shape = {:?}, Y.shape = {:?}",
            x.shape(),
            y.shape()
        )));
    }
    if x.nrows() == 0 {
        return Err(FactorizeError::ShapeMismatch(
            "at least one sample is required".to_string(),
        ));
    }
    if op.input_dim() != x.ncols() || op.output_dim() != y.ncols() {
        return Err(FactorizeError::ShapeMismatch(format!(
            "operator maps {} to {} features, but X has {} and Y has {} columns",
            op.input_dim(),
            op.output_dim(),
            x.ncols(),
            y.ncols()
        )));
    }
    if let Some(bias) = bias {
        if bias.len() != y.ncols() {
            return Err(FactorizeError::ShapeMismatch(format!(
                "bias has length {} but Y has {} columns",
                bias.len(),
                y.ncols()
            )));
        }
    }
    Ok(())
}
