use std::any::Any;

use crate::{
    tensor::{ShapeSpec, TensorDesc},
    utils::error::ConvertError,
};

use super::layer::{Layer, LayerParameters, NodeKind};

/// Fully-connected layer over the flattened input.
///
/// Weights are stored `[in, out]`: element `(i, o)` lives at `i * out + o`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearLayer {
    in_shape: ShapeSpec,
    pub in_features: usize,
    pub out_features: usize,
    params: LayerParameters,
}

impl LinearLayer {
    pub fn new(
        in_shape: ShapeSpec,
        out_features: usize,
        bias: bool,
    ) -> Result<Self, ConvertError> {
        let in_features = in_shape.checked_size()?;
        let weights = TensorDesc::checked(vec![in_features, out_features])?;
        let biases = bias
            .then(|| TensorDesc::checked(vec![out_features]))
            .transpose()?;

        Ok(Self {
            in_shape,
            in_features,
            out_features,
            params: LayerParameters::new(weights, biases, in_features, out_features),
        })
    }

    pub fn has_bias(&self) -> bool {
        self.params.bias.is_some()
    }
}

impl Layer for LinearLayer {
    fn kind(&self) -> NodeKind {
        NodeKind::FullyConnected
    }

    fn in_shape(&self) -> ShapeSpec {
        self.in_shape
    }

    // Output shape is a flat [out_features]
    fn out_shape(&self) -> ShapeSpec {
        ShapeSpec::flat(self.out_features)
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "in={}, out={}, bias={}",
            self.in_features,
            self.out_features,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_input() {
        let fc = LinearLayer::new(ShapeSpec::new(4, 4, 16), 10, true).unwrap();
        assert_eq!(fc.in_features, 256);
        assert_eq!(fc.out_shape(), ShapeSpec::flat(10));
        assert_eq!(fc.parameter_count(), 256 * 10 + 10);
        assert_eq!(
            fc.parameters().unwrap().weight.desc.dims(),
            &[256, 10]
        );
    }

    #[test]
    fn oversized_input_fails() {
        let huge = ShapeSpec::new(1 << 32, 1 << 32, 1 << 32);
        assert!(matches!(
            LinearLayer::new(huge, 10, true),
            Err(ConvertError::UnsupportedShape { field: "shape", .. })
        ));

        let err = LinearLayer::new(ShapeSpec::flat(1 << 40), 1 << 30, false).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedShape { field: "weights", .. }
        ));
    }
}
