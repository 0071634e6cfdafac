//! Factorization of 2d convolutions.
//!
//! A convolution with kernel $W$ of shape `[out_channels, in_channels, kh, kw]`
//! is replaced by a `kh x kw` convolution with `rank` output channels followed
//! by a 1x1 convolution mapping `rank` channels to `out_channels`. The second
//! stage has to be 1x1: a larger kernel would multiply the work per pixel by
//! its area for the same embedding width, and only the first stage can carry
//! the spatial extent of the original kernel while keeping the output shape.
//!
//! With stride 1 the convolution is a matrix product between the unfolded
//! input patches and the flattened kernel, so the problem reduces to
//! [factorize_matrix].

use crate::factorize::{factorize_matrix, FactorizeOptions};
use crate::operator::Operator;
use crate::solution::LowRankSolution;
use crate::types::{FactorScalar, FactorizeError, Result};
use itertools::iproduct;
use ndarray::{Array2, Array4, ArrayView1, ArrayView2, ArrayView4, Ix4};
use tracing::debug;

/// How the border of the input is extended when padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaddingMode {
    Zeros,
    /// Mirror at the border without repeating the edge value.
    Reflect,
    /// Repeat the edge value.
    Replicate,
    /// Wrap around periodically.
    Circular,
}

/// Geometry of a 2d convolution.
///
/// Only stride 1, dilation 1 and a single group are supported by the
/// factorization; [Conv2dParams::validate] rejects anything else.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conv2dParams {
    /// Padding added on both sides of the (height, width) axes.
    pub padding: (usize, usize),
    pub padding_mode: PaddingMode,
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
    pub groups: usize,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Conv2dParams {
            padding: (0, 0),
            padding_mode: PaddingMode::Zeros,
            stride: (1, 1),
            dilation: (1, 1),
            groups: 1,
        }
    }
}

impl Conv2dParams {
    pub fn with_padding(mut self, padding: (usize, usize), padding_mode: PaddingMode) -> Self {
        self.padding = padding;
        self.padding_mode = padding_mode;
        self
    }

    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_dilation(mut self, dilation: (usize, usize)) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    /// Check that the configuration is one the factorization supports.
    pub fn validate(&self) -> Result<()> {
        if self.stride != (1, 1) {
            return Err(FactorizeError::UnsupportedConfiguration(format!(
                "stride != 1 not implemented; got {:?}",
                self.stride
            )));
        }
        if self.dilation != (1, 1) {
            return Err(FactorizeError::UnsupportedConfiguration(format!(
                "dilation != 1 not implemented; got {:?}",
                self.dilation
            )));
        }
        if self.groups != 1 {
            return Err(FactorizeError::UnsupportedConfiguration(format!(
                "groups != 1 not implemented; got {}",
                self.groups
            )));
        }
        Ok(())
    }
}

/// Pad the spatial axes of `[batch, channels, height, width]` activations.
pub fn pad_activations<A: FactorScalar>(
    activations: ArrayView4<A>,
    padding: (usize, usize),
    mode: PaddingMode,
) -> Result<Array4<A>> {
    let (n, c, h, w) = activations.dim();
    let (ph, pw) = padding;

    if h == 0 || w == 0 {
        return Err(FactorizeError::ShapeMismatch(format!(
            "cannot pad empty spatial dimensions {:?}",
            (h, w)
        )));
    }
    let limit_ok = match mode {
        PaddingMode::Zeros | PaddingMode::Replicate => true,
        PaddingMode::Reflect => ph < h && pw < w,
        PaddingMode::Circular => ph <= h && pw <= w,
    };
    if !limit_ok {
        return Err(FactorizeError::ShapeMismatch(format!(
            "padding {:?} too large for {:?} padding of input with spatial shape {:?}",
            padding,
            mode,
            (h, w)
        )));
    }

    let mut padded = Array4::<A>::zeros((n, c, h + 2 * ph, w + 2 * pw));
    for (b, ch, i, j) in iproduct!(0..n, 0..c, 0..h + 2 * ph, 0..w + 2 * pw) {
        let src_i = source_index(i as isize - ph as isize, h, mode);
        let src_j = source_index(j as isize - pw as isize, w, mode);
        if let (Some(src_i), Some(src_j)) = (src_i, src_j) {
            padded[[b, ch, i, j]] = activations[[b, ch, src_i, src_j]];
        }
    }

    Ok(padded)
}

fn source_index(index: isize, len: usize, mode: PaddingMode) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&index) {
        return Some(index as usize);
    }
    match mode {
        PaddingMode::Zeros => None,
        PaddingMode::Reflect => Some((if index < 0 { -index } else { 2 * (n - 1) - index }) as usize),
        PaddingMode::Replicate => Some(index.clamp(0, n - 1) as usize),
        PaddingMode::Circular => Some(index.rem_euclid(n) as usize),
    }
}

/// Unfold `[batch, in_channels, height, width]` activations into patches.
///
/// Returns a matrix of shape `[batch * n_positions, in_channels * kh * kw]`
/// with one row per output position of a stride 1 convolution. Rows run over
/// the batch, then output rows, then output columns. Columns run over the
/// input channels, then kernel rows, then kernel columns, which matches the
/// layout of [weights_to_matrix].
///
/// Non-zero padding modes are applied explicitly first; zero padding is
/// handled while unfolding.
pub fn activations_to_matrix<A: FactorScalar>(
    activations: ArrayView4<A>,
    kernel_size: (usize, usize),
    params: &Conv2dParams,
) -> Result<Array2<A>> {
    params.validate()?;

    let mut padding = params.padding;
    let padded;
    let activations = if padding != (0, 0) && params.padding_mode != PaddingMode::Zeros {
        padded = pad_activations(activations, padding, params.padding_mode)?;
        padding = (0, 0);
        padded.view()
    } else {
        activations.view()
    };

    let (n, c, h, w) = activations.dim();
    let (kh, kw) = kernel_size;
    let (ph, pw) = padding;

    if kh == 0 || kw == 0 || h + 2 * ph < kh || w + 2 * pw < kw {
        return Err(FactorizeError::ShapeMismatch(format!(
            "kernel of size {:?} does not fit input of spatial shape {:?} with padding {:?}",
            kernel_size,
            (h, w),
            padding
        )));
    }

    let (oh, ow) = (h + 2 * ph - kh + 1, w + 2 * pw - kw + 1);
    let mut patches = Array2::<A>::zeros((n * oh * ow, c * kh * kw));

    for ((b, i, j), mut row) in iproduct!(0..n, 0..oh, 0..ow).zip(patches.outer_iter_mut()) {
        for (col, (ch, ki, kj)) in iproduct!(0..c, 0..kh, 0..kw).enumerate() {
            let (y, x) = ((i + ki) as isize - ph as isize, (j + kj) as isize - pw as isize);
            if y >= 0 && x >= 0 && (y as usize) < h && (x as usize) < w {
                row[col] = activations[[b, ch, y as usize, x as usize]];
            }
        }
    }

    Ok(patches)
}

/// Flatten a kernel of shape `[out_channels, in_channels, kh, kw]` into a
/// matrix of shape `[in_channels * kh * kw, out_channels]`.
pub fn weights_to_matrix<A: FactorScalar>(weights: ArrayView4<A>) -> Array2<A> {
    let (out_channels, in_channels, kh, kw) = weights.dim();

    Array2::from_shape_fn((in_channels * kh * kw, out_channels), |(f, oc)| {
        weights[[oc, f / (kh * kw), (f / kw) % kh, f % kw]]
    })
}

/// Restore a kernel of shape `[out_channels, fan_in / (kh * kw), kh, kw]`
/// from a matrix of shape `[fan_in, out_channels]`.
pub fn matrix_to_weights<A: FactorScalar>(
    mat: ArrayView2<A>,
    kernel_size: (usize, usize),
) -> Result<Array4<A>> {
    let (fan_in, out_channels) = mat.dim();
    let (kh, kw) = kernel_size;

    if kh == 0 || kw == 0 || fan_in % (kh * kw) != 0 {
        return Err(FactorizeError::ShapeMismatch(format!(
            "fan in {} is not a multiple of the kernel size {:?}",
            fan_in, kernel_size
        )));
    }

    let shape = (out_channels, fan_in / (kh * kw), kh, kw);
    Ok(Array4::from_shape_fn(shape, |(oc, ch, i, j)| {
        mat[[(ch * kh + i) * kw + j, oc]]
    }))
}

/// Approximate a `kh x kw` convolution by a `kh x kw` convolution with fewer
/// output channels followed by a 1x1 convolution.
///
/// # Arguments
///
/// * `inputs`: Activations of shape `[batch, in_channels, height, width]`.
/// * `wa`: The kernel to factorize, of shape `[out_channels, in_channels, kh, kw]`,
///         or the first stage `[original_rank, in_channels, kh, kw]` of an
///         already factorized convolution.
/// * `wb`: The second stage `[out_channels, original_rank, 1, 1]` of an
///         already factorized convolution.
/// * `bias_a`: Bias added after `wa`.
/// * `bias_b`: Bias added after `wb`. Requires `wb`.
/// * `options`: Target rank and number of iterations.
/// * `params`: Geometry of the convolution.
///
/// The regression targets are computed here by applying the given weights to
/// the unfolded inputs, so they are consistent with the stride 1 unfolding
/// whatever the caller's forward pass does. The returned `wa` has the spatial
/// size of the input kernel, the returned `wb` is 1x1.
pub fn factorize_conv2d<A: FactorScalar>(
    inputs: ArrayView4<A>,
    wa: ArrayView4<A>,
    wb: Option<ArrayView4<A>>,
    bias_a: Option<ArrayView1<A>>,
    bias_b: Option<ArrayView1<A>>,
    options: &FactorizeOptions,
    params: &Conv2dParams,
) -> Result<LowRankSolution<A, Ix4>> {
    params.validate()?;
    if wb.is_none() && bias_b.is_some() {
        return Err(FactorizeError::InconsistentArguments(
            "got bias_b, but wb is None; cannot apply bias".to_string(),
        ));
    }
    check_conv_shapes(inputs, wa, wb, bias_a, bias_b)?;

    let (_, _, kh, kw) = wa.dim();
    let x_mat = activations_to_matrix(inputs, (kh, kw), params)?;
    let wa_mat = weights_to_matrix(wa);

    let mut y_mat = x_mat.dot(&wa_mat);
    if let Some(bias_a) = bias_a {
        y_mat += &bias_a;
    }

    let wb_mat = wb.map(weights_to_matrix);
    if let Some(wb_mat) = &wb_mat {
        y_mat = y_mat.dot(wb_mat);
        if let Some(bias_b) = bias_b {
            y_mat += &bias_b;
        }
    }

    debug!(
        samples = x_mat.nrows(),
        fan_in = x_mat.ncols(),
        out_channels = y_mat.ncols(),
        "unfolded convolution"
    );

    let op = Operator::from_parts(wa_mat, wb_mat)?;
    let solution = factorize_matrix(x_mat.view(), y_mat.view(), &op, None, options)?;

    Ok(LowRankSolution {
        wa: matrix_to_weights(solution.wa.view(), (kh, kw))?,
        wb: match &solution.wb {
            Some(wb) => Some(matrix_to_weights(wb.view(), (1, 1))?),
            None => None,
        },
        bias: solution.bias,
        rank: solution.rank,
        nmse: solution.nmse,
    })
}

fn check_conv_shapes<A: FactorScalar>(
    inputs: ArrayView4<A>,
    wa: ArrayView4<A>,
    wb: Option<ArrayView4<A>>,
    bias_a: Option<ArrayView1<A>>,
    bias_b: Option<ArrayView1<A>>,
) -> Result<()> {
    let in_channels = inputs.shape()[1];
    let (wa_out, wa_in, _, _) = wa.dim();

    if wa_in != in_channels {
        return Err(FactorizeError::ShapeMismatch(format!(
            "kernel expects {} input channels, inputs have {}",
            wa_in, in_channels
        )));
    }
    if let Some(bias_a) = bias_a {
        if bias_a.len() != wa_out {
            return Err(FactorizeError::ShapeMismatch(format!(
                "bias_a has length {} but wa has {} output channels",
                bias_a.len(),
                wa_out
            )));
        }
    }
    if let Some(wb) = wb {
        let (wb_out, wb_in, wb_h, wb_w) = wb.dim();
        if wb_in != wa_out || (wb_h, wb_w) != (1, 1) {
            return Err(FactorizeError::ShapeMismatch(format!(
                "wb must have shape [out_channels, {}, 1, 1], got {:?}",
                wa_out,
                wb.shape()
            )));
        }
        if let Some(bias_b) = bias_b {
            if bias_b.len() != wb_out {
                return Err(FactorizeError::ShapeMismatch(format!(
                    "bias_b has length {} but wb has {} output channels",
                    bias_b.len(),
                    wb_out
                )));
            }
        }
    }
    Ok(())
}
