use std::any::Any;

use crate::{tensor::ShapeSpec, utils::error::ConvertError};

use super::layer::{Layer, NetPhase, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LrnRegion {
    AcrossChannels,
    WithinChannel,
}

/// Local response normalisation. Shape preserving, no learned weights.
#[derive(Clone, Debug, PartialEq)]
pub struct LrnLayer {
    shape: ShapeSpec,
    pub local_size: usize,
    pub alpha: f32,
    pub beta: f32,
    pub k: f32,
    pub region: LrnRegion,
}

impl LrnLayer {
    pub fn new(
        shape: ShapeSpec,
        local_size: usize,
        alpha: f32,
        beta: f32,
        k: f32,
        region: LrnRegion,
    ) -> Self {
        Self {
            shape,
            local_size,
            alpha,
            beta,
            k,
            region,
        }
    }
}

impl Layer for LrnLayer {
    fn kind(&self) -> NodeKind {
        NodeKind::Lrn
    }

    fn in_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn out_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "size={}, alpha={}, beta={}, k={}, region={:?}",
            self.local_size, self.alpha, self.beta, self.k, self.region
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-channel batch normalisation holding running statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchNormLayer {
    shape: ShapeSpec,
    pub epsilon: f32,
    pub momentum: f32,
    phase: NetPhase,
    mean: Vec<f32>,
    variance: Vec<f32>,
}

impl BatchNormLayer {
    pub fn new(shape: ShapeSpec, epsilon: f32, momentum: f32) -> Self {
        Self {
            shape,
            epsilon,
            momentum,
            phase: NetPhase::Test,
            mean: vec![0.0; shape.depth],
            variance: vec![1.0; shape.depth],
        }
    }

    pub fn channels(&self) -> usize {
        self.shape.depth
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    pub fn variance(&self) -> &[f32] {
        &self.variance
    }

    pub fn set_statistics(
        &mut self,
        mean: Vec<f32>,
        variance: Vec<f32>,
    ) -> Result<(), ConvertError> {
        if mean.len() != self.channels() || variance.len() != self.channels() {
            return Err(ConvertError::StatisticsShapeMismatch(format!(
                "{} channels, got mean of {} and variance of {}",
                self.channels(),
                mean.len(),
                variance.len()
            )));
        }
        self.mean = mean;
        self.variance = variance;
        Ok(())
    }

    pub fn phase(&self) -> NetPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: NetPhase) {
        self.phase = phase;
    }
}

impl Layer for BatchNormLayer {
    fn kind(&self) -> NodeKind {
        NodeKind::BatchNorm
    }

    fn in_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn out_shape(&self) -> ShapeSpec {
        self.shape
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "eps={}, momentum={}, phase={:?}",
            self.epsilon, self.momentum, self.phase
        ))
    }

    // running statistics are the stored values of a batch norm node
    fn parameter_count(&self) -> usize {
        self.mean.len() + self.variance.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_norm_statistics_must_match_channels() {
        let mut bn = BatchNormLayer::new(ShapeSpec::new(4, 4, 2), 1e-5, 0.999);
        assert_eq!(bn.mean(), &[0.0, 0.0]);
        assert_eq!(bn.variance(), &[1.0, 1.0]);

        bn.set_statistics(vec![1.0, 2.0], vec![0.5, 0.5]).unwrap();
        assert_eq!(bn.mean(), &[1.0, 2.0]);

        let err = bn.set_statistics(vec![1.0], vec![0.5]).unwrap_err();
        assert!(matches!(err, ConvertError::StatisticsShapeMismatch(_)));
        assert_eq!(bn.parameter_count(), 4);
    }

    #[test]
    fn lrn_preserves_shape() {
        let shape = ShapeSpec::new(13, 13, 96);
        let lrn = LrnLayer::new(shape, 5, 1e-4, 0.75, 1.0, LrnRegion::AcrossChannels);
        assert_eq!(lrn.in_shape(), lrn.out_shape());
        assert_eq!(lrn.parameter_count(), 0);
    }
}
