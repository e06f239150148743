use std::any::Any;

use crate::{
    tensor::{ShapeSpec, TensorDesc},
    utils::{error::ConvertError, math::conv_out_length},
};

use super::{
    conv::Padding,
    layer::{Layer, LayerParameters, NodeKind},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolingMethod {
    Max,
    Average,
}

/// Square-window pooling without padding.
///
/// Average pooling carries a per-channel weight fixed at `1 / kernel^2` and a
/// zero bias, so it loads through the same path as convolutions.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolLayer {
    in_shape: ShapeSpec,
    out_shape: ShapeSpec,
    kernel: usize,
    stride: usize,
    method: PoolingMethod,
    params: Option<LayerParameters>,
}

impl PoolLayer {
    pub fn new(
        in_shape: ShapeSpec,
        kernel: usize,
        stride: usize,
        method: PoolingMethod,
    ) -> Result<Self, ConvertError> {
        let spatial = |in_length: usize| {
            conv_out_length(in_length, kernel, stride, Padding::Valid).ok_or_else(|| {
                ConvertError::UnsupportedShape {
                    field: "kernel_size",
                    detail: format!(
                        "pool window {} stride {} does not fit input {}",
                        kernel, stride, in_shape
                    ),
                }
            })
        };
        let out_shape = ShapeSpec::new(
            spatial(in_shape.width)?,
            spatial(in_shape.height)?,
            in_shape.depth,
        );

        let params = match method {
            PoolingMethod::Max => None,
            PoolingMethod::Average => {
                let per_channel = TensorDesc::new(vec![in_shape.depth]);
                Some(LayerParameters::new(
                    per_channel.clone(),
                    Some(per_channel),
                    kernel * kernel,
                    1,
                ))
            }
        };

        let mut pool = Self {
            in_shape,
            out_shape,
            kernel,
            stride,
            method,
            params,
        };
        pool.reset_constant_weights();
        Ok(pool)
    }

    /// Reapply the fixed averaging weights.
    pub fn reset_constant_weights(&mut self) {
        let weight = 1.0 / (self.kernel * self.kernel) as f32;
        if let Some(params) = &mut self.params {
            params.weight.fill(weight);
            if let Some(bias) = &mut params.bias {
                bias.fill(0.0);
            }
        }
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn method(&self) -> PoolingMethod {
        self.method
    }
}

impl Layer for PoolLayer {
    fn kind(&self) -> NodeKind {
        match self.method {
            PoolingMethod::Max => NodeKind::MaxPool,
            PoolingMethod::Average => NodeKind::AvePool,
        }
    }

    fn in_shape(&self) -> ShapeSpec {
        self.in_shape
    }

    fn out_shape(&self) -> ShapeSpec {
        self.out_shape
    }

    fn config_string(&self) -> Option<String> {
        Some(format!("kernel={}, stride={}", self.kernel, self.stride))
    }

    fn parameters(&self) -> Option<&LayerParameters> {
        self.params.as_ref()
    }

    fn parameters_mut(&mut self) -> Option<&mut LayerParameters> {
        self.params.as_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
