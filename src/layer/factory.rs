use crate::{tensor::ShapeSpec, utils::error::ConvertError};

use super::{
    activations::{ActivationLayer, ActivationType},
    connection_table::ConnectionTable,
    conv::{ConvLayer, Padding},
    dropout::DropoutLayer,
    layer::Layer,
    linear::LinearLayer,
    normalization::{BatchNormLayer, LrnLayer, LrnRegion},
    pool::{PoolLayer, PoolingMethod},
};

pub struct Layers;

impl Layers {
    pub fn conv(
        in_shape: ShapeSpec,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        table: ConnectionTable,
        bias: bool,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        Ok(Box::new(ConvLayer::new(
            in_shape,
            out_channels,
            kernel,
            stride,
            padding,
            table,
            bias,
        )?))
    }

    pub fn deconv(
        in_shape: ShapeSpec,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        table: ConnectionTable,
        bias: bool,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        Ok(Box::new(ConvLayer::new_transposed(
            in_shape,
            out_channels,
            kernel,
            stride,
            padding,
            table,
            bias,
        )?))
    }

    pub fn linear(
        in_shape: ShapeSpec,
        out_features: usize,
        bias: bool,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        Ok(Box::new(LinearLayer::new(in_shape, out_features, bias)?))
    }

    pub fn max_pool(
        in_shape: ShapeSpec,
        kernel: usize,
        stride: usize,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        Ok(Box::new(PoolLayer::new(
            in_shape,
            kernel,
            stride,
            PoolingMethod::Max,
        )?))
    }

    pub fn ave_pool(
        in_shape: ShapeSpec,
        kernel: usize,
        stride: usize,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        Ok(Box::new(PoolLayer::new(
            in_shape,
            kernel,
            stride,
            PoolingMethod::Average,
        )?))
    }

    pub fn lrn(
        shape: ShapeSpec,
        local_size: usize,
        alpha: f32,
        beta: f32,
        k: f32,
        region: LrnRegion,
    ) -> Box<dyn Layer> {
        Box::new(LrnLayer::new(shape, local_size, alpha, beta, k, region))
    }

    pub fn dropout(shape: ShapeSpec, rate: f32) -> Box<dyn Layer> {
        Box::new(DropoutLayer::new(shape, rate))
    }

    pub fn batch_norm(shape: ShapeSpec, epsilon: f32, momentum: f32) -> Box<dyn Layer> {
        Box::new(BatchNormLayer::new(shape, epsilon, momentum))
    }

    pub fn activation(activation_type: ActivationType, shape: ShapeSpec) -> Box<dyn Layer> {
        Box::new(ActivationLayer::new(activation_type, shape))
    }
}
