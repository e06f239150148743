use std::fmt;

use crate::{layer::NodeKind, utils::error::ConvertError};

/// Caffe layer types that are converted into nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Convolution,
    Deconvolution,
    InnerProduct,
    Pooling,
    Lrn,
    Dropout,
    BatchNorm,
    Softmax,
    SoftmaxWithLoss,
    Sigmoid,
    SigmoidCrossEntropyLoss,
    ReLU,
    TanH,
}

/// Data, loss and metric markers that carry nothing to build.
pub const SKIPPED_LAYER_TYPES: [&str; 4] = ["Data", "EuclideanLoss", "Input", "Accuracy"];

impl LayerKind {
    pub const ALL: [LayerKind; 13] = [
        LayerKind::Convolution,
        LayerKind::Deconvolution,
        LayerKind::InnerProduct,
        LayerKind::Pooling,
        LayerKind::Lrn,
        LayerKind::Dropout,
        LayerKind::BatchNorm,
        LayerKind::Softmax,
        LayerKind::SoftmaxWithLoss,
        LayerKind::Sigmoid,
        LayerKind::SigmoidCrossEntropyLoss,
        LayerKind::ReLU,
        LayerKind::TanH,
    ];

    pub fn from_type(layer_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == layer_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Convolution => "Convolution",
            LayerKind::Deconvolution => "Deconvolution",
            LayerKind::InnerProduct => "InnerProduct",
            LayerKind::Pooling => "Pooling",
            LayerKind::Lrn => "LRN",
            LayerKind::Dropout => "Dropout",
            LayerKind::BatchNorm => "BatchNorm",
            LayerKind::Softmax => "Softmax",
            LayerKind::SoftmaxWithLoss => "SoftmaxWithLoss",
            LayerKind::Sigmoid => "Sigmoid",
            LayerKind::SigmoidCrossEntropyLoss => "SigmoidCrossEntropyLoss",
            LayerKind::ReLU => "ReLU",
            LayerKind::TanH => "TanH",
        }
    }

    /// Whether descriptor blobs for this kind are consumed by the transcoder.
    pub fn has_weights(&self) -> bool {
        matches!(
            self,
            LayerKind::Convolution
                | LayerKind::Deconvolution
                | LayerKind::InnerProduct
                | LayerKind::Pooling
                | LayerKind::BatchNorm
        )
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    Skipped,
    Supported(LayerKind),
}

pub fn layer_skipped(layer_type: &str) -> bool {
    SKIPPED_LAYER_TYPES.contains(&layer_type)
}

pub fn layer_supported(layer_type: &str) -> bool {
    LayerKind::from_type(layer_type).is_some()
}

/// Sort a layer type into skip-list, allow-list, or failure.
pub fn classify(layer_type: &str) -> Result<Support, ConvertError> {
    if layer_skipped(layer_type) {
        return Ok(Support::Skipped);
    }
    LayerKind::from_type(layer_type)
        .map(Support::Supported)
        .ok_or_else(|| ConvertError::UnsupportedLayer(layer_type.to_string()))
}

/// Whether a caffe layer of `kind` can load its weights into a node of `node`.
pub fn layer_match(kind: LayerKind, node: NodeKind) -> bool {
    matches!(
        (kind, node),
        (LayerKind::InnerProduct, NodeKind::FullyConnected)
            | (LayerKind::Convolution, NodeKind::Conv)
            | (LayerKind::Deconvolution, NodeKind::Deconv)
            | (LayerKind::Pooling, NodeKind::AvePool)
            | (LayerKind::Pooling, NodeKind::MaxPool)
            | (LayerKind::BatchNorm, NodeKind::BatchNorm)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_its_type_string() {
        for kind in LayerKind::ALL {
            assert_eq!(LayerKind::from_type(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn classify_splits_skip_and_allow_lists() {
        assert_eq!(classify("Data").unwrap(), Support::Skipped);
        assert_eq!(classify("Input").unwrap(), Support::Skipped);
        assert_eq!(
            classify("LRN").unwrap(),
            Support::Supported(LayerKind::Lrn)
        );
        assert_eq!(
            classify("Eltwise").unwrap_err(),
            ConvertError::UnsupportedLayer("Eltwise".to_string())
        );
    }

    #[test]
    fn skip_and_allow_lists_are_disjoint() {
        for t in SKIPPED_LAYER_TYPES {
            assert!(!layer_supported(t));
        }
    }

    #[test]
    fn activations_carry_no_weights() {
        assert!(!LayerKind::ReLU.has_weights());
        assert!(!LayerKind::Dropout.has_weights());
        assert!(!LayerKind::Lrn.has_weights());
        assert!(LayerKind::InnerProduct.has_weights());
    }

    #[test]
    fn match_pairs_kinds() {
        assert!(layer_match(LayerKind::InnerProduct, NodeKind::FullyConnected));
        assert!(layer_match(LayerKind::Pooling, NodeKind::MaxPool));
        assert!(layer_match(LayerKind::Pooling, NodeKind::AvePool));
        assert!(!layer_match(LayerKind::Convolution, NodeKind::Deconv));
        assert!(!layer_match(LayerKind::ReLU, NodeKind::FullyConnected));
    }
}
