use std::any::Any;

use crate::{
    tensor::{ShapeSpec, TensorDesc},
    utils::{
        error::ConvertError,
        math::{conv_out_length, deconv_out_length},
    },
};

use super::{
    connection_table::ConnectionTable,
    layer::{Layer, LayerParameters, NodeKind},
};

/// Padding policy of a window-based layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Padding {
    /// No padding, output shrinks by `kernel - 1`
    Valid,
    /// Pad by `(kernel - 1) / 2`, output is `ceil(in / stride)`
    Same,
}

/// Square-kernel 2-D convolution, forward or transposed.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvLayer {
    in_shape: ShapeSpec,
    out_shape: ShapeSpec,
    kernel: usize,
    stride: usize,
    padding: Padding,
    table: ConnectionTable,
    transposed: bool,
    params: LayerParameters,
}

impl ConvLayer {
    pub fn new(
        in_shape: ShapeSpec,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        table: ConnectionTable,
        bias: bool,
    ) -> Result<Self, ConvertError> {
        Self::new_with(
            in_shape,
            out_channels,
            kernel,
            stride,
            padding,
            table,
            bias,
            false,
        )
    }

    pub fn new_transposed(
        in_shape: ShapeSpec,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        table: ConnectionTable,
        bias: bool,
    ) -> Result<Self, ConvertError> {
        Self::new_with(
            in_shape,
            out_channels,
            kernel,
            stride,
            padding,
            table,
            bias,
            true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new_with(
        in_shape: ShapeSpec,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        table: ConnectionTable,
        bias: bool,
        transposed: bool,
    ) -> Result<Self, ConvertError> {
        if table.in_channels() != in_shape.depth || table.out_channels() != out_channels {
            return Err(ConvertError::UnsupportedShape {
                field: "group",
                detail: format!(
                    "connection table is {}x{} but layer maps {} to {} channels",
                    table.in_channels(),
                    table.out_channels(),
                    in_shape.depth,
                    out_channels
                ),
            });
        }

        let out_length = if transposed {
            deconv_out_length
        } else {
            conv_out_length
        };
        let spatial = |in_length: usize, axis: &str| {
            out_length(in_length, kernel, stride, padding).ok_or_else(|| {
                ConvertError::UnsupportedShape {
                    field: "kernel_size",
                    detail: format!(
                        "kernel {} stride {} ({:?}) does not fit input {} of {}",
                        kernel, stride, padding, axis, in_length
                    ),
                }
            })
        };
        let out_shape = ShapeSpec::new(
            spatial(in_shape.width, "width")?,
            spatial(in_shape.height, "height")?,
            out_channels,
        );
        out_shape.checked_size()?;

        // weights: [out_channels, in_channels/group, k, k]
        let weight_desc = TensorDesc::checked(vec![
            out_channels,
            table.in_channels_per_group(),
            kernel,
            kernel,
        ])?;
        let (fan_in, fan_out) = weight_desc.calculate_fan_in_out();
        let bias_desc = bias
            .then(|| TensorDesc::checked(vec![out_channels]))
            .transpose()?;

        Ok(Self {
            in_shape,
            out_shape,
            kernel,
            stride,
            padding,
            table,
            transposed,
            params: LayerParameters::new(weight_desc, bias_desc, fan_in, fan_out),
        })
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    pub fn in_channels(&self) -> usize {
        self.in_shape.depth
    }

    pub fn out_channels(&self) -> usize {
        self.out_shape.depth
    }

    pub fn has_bias(&self) -> bool {
        self.params.bias.is_some()
    }
}

impl Layer for ConvLayer {
    fn kind(&self) -> NodeKind {
        if self.transposed {
            NodeKind::Deconv
        } else {
            NodeKind::Conv
        }
    }

    fn in_shape(&self) -> ShapeSpec {
        self.in_shape
    }

    fn out_shape(&self) -> ShapeSpec {
        self.out_shape
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "kernel={}, stride={}, padding={:?}, groups={}, bias={}",
            self.kernel,
            self.stride,
            self.padding,
            self.table.groups(),
            self.has_bias()
        ))
    }

    fn parameters(&self) -> Option<&LayerParameters> {
        Some(&self.params)
    }

    fn parameters_mut(&mut self) -> Option<&mut LayerParameters> {
        Some(&mut self.params)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
