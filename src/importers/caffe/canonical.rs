//! Resolves the redundant encodings of a caffe parameter bag into a single
//! normalised record per layer kind. Pure: no shapes, no side effects.

use crate::{
    layer::{ActivationType, LrnRegion, Padding, PoolingMethod},
    utils::error::ConvertError,
    weight_initialiser::WeightInit,
};

use super::{
    defaults,
    descriptor::{FillerParameter, LayerDescriptor, NormRegion, PoolMethod},
    support::LayerKind,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ConvParams {
    pub kernel: usize,
    pub stride: usize,
    pub padding: Padding,
    pub groups: usize,
    pub out_channels: usize,
    pub has_bias: bool,
    pub weight_filler: Option<WeightInit>,
    pub bias_filler: Option<WeightInit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PoolParams {
    pub kernel: usize,
    pub stride: usize,
    pub method: PoolingMethod,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InnerProductParams {
    pub out_channels: usize,
    pub has_bias: bool,
    /// Source blob already stored (in, out)
    pub transposed_source: bool,
    pub weight_filler: Option<WeightInit>,
    pub bias_filler: Option<WeightInit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LrnParams {
    pub local_size: usize,
    pub alpha: f32,
    pub beta: f32,
    pub k: f32,
    pub region: LrnRegion,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropoutParams {
    pub rate: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchNormParams {
    pub epsilon: f32,
    pub momentum: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalParams {
    Convolution(ConvParams),
    Deconvolution(ConvParams),
    InnerProduct(InnerProductParams),
    Pooling(PoolParams),
    Lrn(LrnParams),
    Dropout(DropoutParams),
    BatchNorm(BatchNormParams),
    Activation(ActivationType),
}

pub fn canonicalize(
    kind: LayerKind,
    layer: &LayerDescriptor,
) -> Result<CanonicalParams, ConvertError> {
    match kind {
        LayerKind::Convolution => Ok(CanonicalParams::Convolution(convolution(layer)?)),
        LayerKind::Deconvolution => Ok(CanonicalParams::Deconvolution(convolution(layer)?)),
        LayerKind::InnerProduct => Ok(CanonicalParams::InnerProduct(inner_product(layer)?)),
        LayerKind::Pooling => Ok(CanonicalParams::Pooling(pooling(layer)?)),
        LayerKind::Lrn => Ok(CanonicalParams::Lrn(lrn(layer)?)),
        LayerKind::Dropout => Ok(CanonicalParams::Dropout(dropout(layer)?)),
        LayerKind::BatchNorm => Ok(CanonicalParams::BatchNorm(batch_norm(layer))),
        // loss front ends collapse to their plain activation
        LayerKind::Softmax | LayerKind::SoftmaxWithLoss => {
            Ok(CanonicalParams::Activation(ActivationType::Softmax))
        }
        LayerKind::Sigmoid | LayerKind::SigmoidCrossEntropyLoss => {
            Ok(CanonicalParams::Activation(ActivationType::Sigmoid))
        }
        LayerKind::ReLU => Ok(CanonicalParams::Activation(ActivationType::ReLU)),
        LayerKind::TanH => Ok(CanonicalParams::Activation(ActivationType::TanH)),
    }
}

fn convolution(layer: &LayerDescriptor) -> Result<ConvParams, ConvertError> {
    let p = layer
        .convolution_param
        .as_ref()
        .ok_or(ConvertError::MissingRequiredParameter("convolution_param"))?;

    let kernel = resolve_axes(
        "kernel",
        single_entry("kernel_size", &p.kernel_size)?,
        p.kernel_h,
        p.kernel_w,
    )?
    .ok_or(ConvertError::MissingRequiredParameter("kernel_size"))?;
    require_positive("kernel_size", kernel)?;

    let stride = resolve_axes(
        "stride",
        single_entry("stride", &p.stride)?,
        p.stride_h,
        p.stride_w,
    )?
    .unwrap_or(defaults::CONV_STRIDE);
    require_positive("stride", stride)?;

    let pad = resolve_axes("pad", single_entry("pad", &p.pad)?, p.pad_h, p.pad_w)?
        .unwrap_or(defaults::CONV_PAD);
    let padding = padding_policy(pad, kernel)?;

    if let Some(d) = p.dilation.iter().find(|d| **d != 1) {
        return Err(ConvertError::UnsupportedShape {
            field: "dilation",
            detail: format!("dilation {} is not supported, only 1", d),
        });
    }

    let out_channels = p
        .num_output
        .ok_or(ConvertError::MissingRequiredParameter("num_output"))? as usize;
    require_positive("num_output", out_channels)?;

    let groups = p.group.map_or(defaults::CONV_GROUPS, |g| g as usize);
    require_positive("group", groups)?;

    Ok(ConvParams {
        kernel,
        stride,
        padding,
        groups,
        out_channels,
        has_bias: p.bias_term.unwrap_or(defaults::BIAS_TERM),
        weight_filler: filler(p.weight_filler.as_ref())?,
        bias_filler: filler(p.bias_filler.as_ref())?,
    })
}

fn pooling(layer: &LayerDescriptor) -> Result<PoolParams, ConvertError> {
    let p = layer
        .pooling_param
        .as_ref()
        .ok_or(ConvertError::MissingRequiredParameter("pooling_param"))?;

    if p.global_pooling == Some(true) {
        return Err(ConvertError::UnsupportedParameter {
            field: "global_pooling",
            detail: "global pooling is not supported".to_string(),
        });
    }

    let kernel = resolve_axes("kernel", p.kernel_size, p.kernel_h, p.kernel_w)?
        .ok_or(ConvertError::MissingRequiredParameter("kernel_size"))?;
    require_positive("kernel_size", kernel)?;

    let stride = resolve_axes("stride", p.stride, p.stride_h, p.stride_w)?.unwrap_or(kernel);
    require_positive("stride", stride)?;

    let pad = resolve_axes("pad", p.pad, p.pad_h, p.pad_w)?.unwrap_or(defaults::POOL_PAD);
    if pad != 0 {
        return Err(ConvertError::UnsupportedShape {
            field: "pad",
            detail: format!("pooling pad {} is not supported, only 0", pad),
        });
    }

    let method = match p.pool {
        None => defaults::POOL_METHOD,
        Some(PoolMethod::Max) => PoolingMethod::Max,
        Some(PoolMethod::Ave) => PoolingMethod::Average,
        Some(PoolMethod::Stochastic) => {
            return Err(ConvertError::UnsupportedParameter {
                field: "pool",
                detail: "stochastic pooling is not supported".to_string(),
            });
        }
    };

    Ok(PoolParams {
        kernel,
        stride,
        method,
    })
}

fn inner_product(layer: &LayerDescriptor) -> Result<InnerProductParams, ConvertError> {
    let p = layer
        .inner_product_param
        .as_ref()
        .ok_or(ConvertError::MissingRequiredParameter("inner_product_param"))?;

    let out_channels = p
        .num_output
        .ok_or(ConvertError::MissingRequiredParameter("num_output"))? as usize;
    require_positive("num_output", out_channels)?;

    Ok(InnerProductParams {
        out_channels,
        has_bias: p.bias_term.unwrap_or(defaults::BIAS_TERM),
        transposed_source: p.transpose.unwrap_or(defaults::INNER_PRODUCT_TRANSPOSE),
        weight_filler: filler(p.weight_filler.as_ref())?,
        bias_filler: filler(p.bias_filler.as_ref())?,
    })
}

fn lrn(layer: &LayerDescriptor) -> Result<LrnParams, ConvertError> {
    let p = layer
        .lrn_param
        .as_ref()
        .ok_or(ConvertError::MissingRequiredParameter("lrn_param"))?;

    let local_size = p
        .local_size
        .map_or(defaults::LRN.local_size, |s| s as usize);
    if local_size % 2 == 0 {
        return Err(ConvertError::UnsupportedParameter {
            field: "local_size",
            detail: format!("local_size must be odd, got {}", local_size),
        });
    }

    let region = match p.norm_region {
        None => defaults::LRN.region,
        Some(NormRegion::AcrossChannels) => LrnRegion::AcrossChannels,
        Some(NormRegion::WithinChannel) => LrnRegion::WithinChannel,
    };

    Ok(LrnParams {
        local_size,
        alpha: p.alpha.unwrap_or(defaults::LRN.alpha),
        beta: p.beta.unwrap_or(defaults::LRN.beta),
        k: p.k.unwrap_or(defaults::LRN.k),
        region,
    })
}

fn dropout(layer: &LayerDescriptor) -> Result<DropoutParams, ConvertError> {
    let rate = layer
        .dropout_param
        .as_ref()
        .and_then(|p| p.dropout_ratio)
        .unwrap_or(defaults::DROPOUT.rate);

    if !(0.0..1.0).contains(&rate) {
        return Err(ConvertError::UnsupportedParameter {
            field: "dropout_ratio",
            detail: format!("dropout ratio {} outside [0, 1)", rate),
        });
    }
    Ok(DropoutParams { rate })
}

fn batch_norm(layer: &LayerDescriptor) -> BatchNormParams {
    let p = layer.batch_norm_param.as_ref();
    BatchNormParams {
        epsilon: p
            .and_then(|p| p.eps)
            .unwrap_or(defaults::BATCH_NORM.epsilon),
        momentum: p
            .and_then(|p| p.moving_average_fraction)
            .unwrap_or(defaults::BATCH_NORM.momentum),
    }
}

fn filler(param: Option<&FillerParameter>) -> Result<Option<WeightInit>, ConvertError> {
    param.map(WeightInit::from_filler).transpose()
}

/// A repeated field may hold at most one (square) value.
fn single_entry(field: &'static str, values: &[u32]) -> Result<Option<u32>, ConvertError> {
    match values {
        [] => Ok(None),
        [v] => Ok(Some(*v)),
        _ => Err(ConvertError::UnsupportedShape {
            field,
            detail: format!(
                "{} entries {:?}, only a single square value is supported",
                values.len(),
                values
            ),
        }),
    }
}

/// Merge a symmetric value with its `_h`/`_w` pair. All given values must agree.
fn resolve_axes(
    field: &'static str,
    symmetric: Option<u32>,
    h: Option<u32>,
    w: Option<u32>,
) -> Result<Option<usize>, ConvertError> {
    let per_axis = match (h, w) {
        (Some(h), Some(w)) if h != w => {
            return Err(ConvertError::AmbiguousParameter {
                field,
                detail: format!("{}_h={} differs from {}_w={}", field, h, field, w),
            });
        }
        (Some(h), Some(_)) => Some(h),
        (None, None) => None,
        (Some(_), None) | (None, Some(_)) => {
            return Err(ConvertError::AmbiguousParameter {
                field,
                detail: format!("only one of {}_h and {}_w is given", field, field),
            });
        }
    };

    match (symmetric, per_axis) {
        (Some(s), Some(a)) if s != a => Err(ConvertError::AmbiguousParameter {
            field,
            detail: format!("{}={} conflicts with per-axis value {}", field, s, a),
        }),
        (Some(s), _) => Ok(Some(s as usize)),
        (None, a) => Ok(a.map(|v| v as usize)),
    }
}

// 0 is valid, (kernel-1)/2 is same; nothing else has a faithful counterpart
fn padding_policy(pad: usize, kernel: usize) -> Result<Padding, ConvertError> {
    if pad == 0 {
        Ok(Padding::Valid)
    } else if pad == (kernel - 1) / 2 {
        Ok(Padding::Same)
    } else {
        Err(ConvertError::UnsupportedShape {
            field: "pad",
            detail: format!(
                "pad {} with kernel {}, only 0 (valid) or (kernel-1)/2 (same)",
                pad, kernel
            ),
        })
    }
}

fn require_positive(field: &'static str, value: usize) -> Result<(), ConvertError> {
    if value == 0 {
        return Err(ConvertError::UnsupportedShape {
            field,
            detail: "must be positive".to_string(),
        });
    }
    Ok(())
}
