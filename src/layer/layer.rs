use std::{any::Any, fmt};

use rand::Rng;

use crate::{
    tensor::{ShapeSpec, Tensor, TensorDesc},
    utils::error::ConvertError,
    weight_initialiser::WeightInit,
};

use super::activations::ActivationType;

/// Kind tag of a constructed node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Conv,
    Deconv,
    FullyConnected,
    MaxPool,
    AvePool,
    Lrn,
    Dropout,
    BatchNorm,
    Activation(ActivationType),
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Conv => "conv",
            NodeKind::Deconv => "deconv",
            NodeKind::FullyConnected => "fully-connected",
            NodeKind::MaxPool => "max-pool",
            NodeKind::AvePool => "ave-pool",
            NodeKind::Lrn => "lrn",
            NodeKind::Dropout => "dropout",
            NodeKind::BatchNorm => "batch-norm",
            NodeKind::Activation(a) => a.name(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a node runs with training behaviour (dropout masks, batch statistics).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NetPhase {
    Train,
    #[default]
    Test,
}

/// The (weight, bias) pair owned by a parameterised node.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerParameters {
    pub weight: Tensor,
    pub bias: Option<Tensor>,
    fan_in: usize,
    fan_out: usize,
}

impl LayerParameters {
    pub fn new(
        weight: TensorDesc,
        bias: Option<TensorDesc>,
        fan_in: usize,
        fan_out: usize,
    ) -> Self {
        Self {
            weight: Tensor::zeros(weight),
            bias: bias.map(Tensor::zeros),
            fan_in,
            fan_out,
        }
    }

    pub fn count(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, Tensor::len)
    }

    pub fn initialise<R: Rng + ?Sized>(
        &mut self,
        weight_init: &WeightInit,
        bias_init: &WeightInit,
        rng: &mut R,
    ) -> Result<(), ConvertError> {
        self.weight
            .initialise(weight_init, self.fan_in, self.fan_out, rng)?;
        if let Some(bias) = &mut self.bias {
            bias.initialise(bias_init, self.fan_in, self.fan_out, rng)?;
        }
        Ok(())
    }
}

pub trait Layer: fmt::Debug {
    fn kind(&self) -> NodeKind;

    // Return a string representation of the layers name
    fn name(&self) -> String {
        self.kind().to_string()
    }

    fn in_shape(&self) -> ShapeSpec;

    fn out_shape(&self) -> ShapeSpec;

    // Return optional configuration details for the layer
    fn config_string(&self) -> Option<String> {
        None
    }

    fn parameters(&self) -> Option<&LayerParameters> {
        None
    }

    fn parameters_mut(&mut self) -> Option<&mut LayerParameters> {
        None
    }

    // Return the total number of parameters in this layer
    fn parameter_count(&self) -> usize {
        self.parameters().map_or(0, LayerParameters::count)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
