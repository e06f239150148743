use std::any::Any;

use crate::tensor::ShapeSpec;

use super::layer::{Layer, NetPhase, NodeKind};

#[derive(Clone, Debug, PartialEq)]
pub struct DropoutLayer {
    shape: ShapeSpec,
    pub rate: f32,
    phase: NetPhase,
}

impl DropoutLayer {
    /// Built in inference mode; switching to training is up to the caller.
    pub fn new(shape: ShapeSpec, rate: f32) -> Self {
        Self {
            shape,
            rate,
            phase: NetPhase::Test,
        }
    }

    pub fn phase(&self) -> NetPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: NetPhase) {
        self.phase = phase;
    }
}

impl Layer for DropoutLayer {
    fn kind(&self) -> NodeKind {
        NodeKind::Dropout
    }

    fn in_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn out_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn config_string(&self) -> Option<String> {
        Some(format!("rate={}, phase={:?}", self.rate, self.phase))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
