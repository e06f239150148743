use thiserror::Error;

/// Everything that can go wrong while turning one layer descriptor into a node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("Ambiguous parameter '{field}': {detail}")]
    AmbiguousParameter { field: &'static str, detail: String },

    #[error("Unsupported shape for '{field}': {detail}")]
    UnsupportedShape { field: &'static str, detail: String },

    #[error("Unsupported parameter '{field}': {detail}")]
    UnsupportedParameter { field: &'static str, detail: String },

    #[error("Missing required parameter: {0}")]
    MissingRequiredParameter(&'static str),

    #[error("Unknown input '{0}': no earlier layer registered this blob")]
    UnknownInput(String),

    #[error("Unsupported layer type '{0}'")]
    UnsupportedLayer(String),

    #[error("Unsupported filler: {0}")]
    UnsupportedFiller(String),

    #[error(
        "Layer size mismatch: caffe({layer}) blob has {found} elements, \
         {dest_kind} expects {expected}"
    )]
    WeightSizeMismatch {
        layer: String,
        found: usize,
        dest_kind: String,
        expected: usize,
    },

    #[error("Unexpected batch norm statistics: {0}")]
    StatisticsShapeMismatch(String),

    #[error(
        "Invalid group count {groups} for {in_channels} input and {out_channels} output channels"
    )]
    InvalidGroupCount {
        groups: usize,
        in_channels: usize,
        out_channels: usize,
    },

    #[error("Missing blob #{index} ({role})")]
    MissingWeightBlob { index: usize, role: &'static str },

    #[error("Blob #{index} declares {declared} elements but holds {found}")]
    BlobShapeMismatch {
        index: usize,
        declared: usize,
        found: usize,
    },

    #[error(
        "Blob of caffe({layer}) holds non-zero weights for unconnected channels \
         (out {out_channel}, in {in_channel})"
    )]
    UnconnectedWeights {
        layer: String,
        out_channel: usize,
        in_channel: usize,
    },

    #[error("Caffe layer type '{layer_type}' cannot load weights into {dest_kind}")]
    LayerMismatch {
        layer_type: String,
        dest_kind: String,
    },
}

/// A `ConvertError` tagged with the descriptor entry it came from.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {error}", location(.index, .name, .layer_type))]
pub struct ImportError {
    /// Position in the descriptor's layer sequence, `None` for net-level inputs
    pub index: Option<usize>,
    pub name: String,
    pub layer_type: String,
    #[source]
    pub error: ConvertError,
}

impl ImportError {
    pub fn at(index: usize, name: &str, layer_type: &str, error: ConvertError) -> Self {
        Self {
            index: Some(index),
            name: name.to_string(),
            layer_type: layer_type.to_string(),
            error,
        }
    }

    pub fn net_input(name: &str, error: ConvertError) -> Self {
        Self {
            index: None,
            name: name.to_string(),
            layer_type: "Input".to_string(),
            error,
        }
    }
}

fn location(index: &Option<usize>, name: &str, layer_type: &str) -> String {
    match index {
        Some(i) => format!("Layer #{} '{}' ({})", i, name, layer_type),
        None => format!("Net input '{}'", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_error_names_layer_position() {
        let err = ImportError::at(
            2,
            "conv1",
            "Convolution",
            ConvertError::MissingRequiredParameter("kernel_size"),
        );
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("conv1"));
        assert!(msg.contains("Convolution"));
        assert!(msg.contains("kernel_size"));
    }

    #[test]
    fn weight_mismatch_names_both_sides() {
        let err = ConvertError::WeightSizeMismatch {
            layer: "ip1".to_string(),
            found: 11,
            dest_kind: "fully-connected".to_string(),
            expected: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("caffe(ip1)"));
        assert!(msg.contains("fully-connected"));
        assert!(msg.contains("11"));
        assert!(msg.contains("12"));
    }
}
