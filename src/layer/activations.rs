use std::any::Any;

use crate::tensor::ShapeSpec;

use super::layer::{Layer, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivationType {
    ReLU,
    Sigmoid,
    Softmax,
    TanH,
}

impl ActivationType {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationType::ReLU => "relu",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::Softmax => "softmax",
            ActivationType::TanH => "tanh",
        }
    }
}

// Shape-preserving element-wise activation
#[derive(Clone, Debug, PartialEq)]
pub struct ActivationLayer {
    pub activation_type: ActivationType,
    shape: ShapeSpec,
}

impl ActivationLayer {
    pub fn new(activation_type: ActivationType, shape: ShapeSpec) -> Self {
        Self {
            activation_type,
            shape,
        }
    }
}

impl Layer for ActivationLayer {
    fn kind(&self) -> NodeKind {
        NodeKind::Activation(self.activation_type)
    }

    fn in_shape(&self) -> ShapeSpec {
        self.shape
    }

    // Activation functions preserve input shape
    fn out_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
