//! Decoded caffe records.
//!
//! Field names follow the external format so any serde front end (text or
//! binary) can decode straight into these types. Everything here is read-only
//! input to the importer.

use serde::{Deserialize, Serialize};

use crate::utils::error::ConvertError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetDescriptor {
    pub name: String,
    /// Net-level input blob names
    pub input: Vec<String>,
    /// One shape per input, or a single shape shared by all of them
    pub input_shape: Vec<BlobShape>,
    /// Legacy 4-D input dims, four entries per input
    pub input_dim: Vec<i64>,
    pub layer: Vec<LayerDescriptor>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    pub bottom: Vec<String>,
    pub top: Vec<String>,
    /// Positional: blob 0 is the weight, blob 1 the bias
    pub blobs: Vec<BlobProto>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub convolution_param: Option<ConvolutionParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pooling_param: Option<PoolingParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_product_param: Option<InnerProductParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lrn_param: Option<LRNParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropout_param: Option<DropoutParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_norm_param: Option<BatchNormParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_param: Option<InputParameter>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobShape {
    pub dim: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobProto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<BlobShape>,
    pub data: Vec<f32>,

    // legacy 4-D shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
}

impl BlobProto {
    pub fn from_data(data: Vec<f32>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Element count the blob claims to hold, if it declares a shape at all.
    pub fn declared_count(&self) -> Result<Option<usize>, ConvertError> {
        if let Some(shape) = &self.shape {
            return element_count(shape.dim.iter().copied()).map(Some);
        }

        let legacy = [self.num, self.channels, self.height, self.width];
        if legacy.iter().all(Option::is_none) {
            return Ok(None);
        }
        element_count(legacy.iter().map(|d| d.unwrap_or(1))).map(Some)
    }
}

fn element_count(dims: impl Iterator<Item = i64> + Clone) -> Result<usize, ConvertError> {
    dims.clone()
        .try_fold(1usize, |acc, d| acc.checked_mul(d.max(0) as usize))
        .ok_or_else(|| ConvertError::UnsupportedShape {
            field: "blob",
            detail: format!(
                "element count of {:?} overflows",
                dims.collect::<Vec<_>>()
            ),
        })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerParameter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub filler_type: Option<String>,
    pub value: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f32>,
    pub std: Option<f32>,
    pub variance_norm: Option<VarianceNorm>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarianceNorm {
    #[default]
    FanIn,
    FanOut,
    Average,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionParameter {
    pub num_output: Option<u32>,
    pub bias_term: Option<bool>,

    pub pad: Vec<u32>,
    pub kernel_size: Vec<u32>,
    pub stride: Vec<u32>,
    pub dilation: Vec<u32>,

    pub pad_h: Option<u32>,
    pub pad_w: Option<u32>,
    pub kernel_h: Option<u32>,
    pub kernel_w: Option<u32>,
    pub stride_h: Option<u32>,
    pub stride_w: Option<u32>,

    pub group: Option<u32>,
    pub weight_filler: Option<FillerParameter>,
    pub bias_filler: Option<FillerParameter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolMethod {
    Max,
    Ave,
    Stochastic,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingParameter {
    pub pool: Option<PoolMethod>,

    pub pad: Option<u32>,
    pub pad_h: Option<u32>,
    pub pad_w: Option<u32>,
    pub kernel_size: Option<u32>,
    pub kernel_h: Option<u32>,
    pub kernel_w: Option<u32>,
    pub stride: Option<u32>,
    pub stride_h: Option<u32>,
    pub stride_w: Option<u32>,

    pub global_pooling: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerProductParameter {
    pub num_output: Option<u32>,
    pub bias_term: Option<bool>,
    pub weight_filler: Option<FillerParameter>,
    pub bias_filler: Option<FillerParameter>,
    /// Weights stored as (in, out) instead of (out, in)
    pub transpose: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormRegion {
    AcrossChannels,
    WithinChannel,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LRNParameter {
    pub local_size: Option<u32>,
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub norm_region: Option<NormRegion>,
    pub k: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutParameter {
    pub dropout_ratio: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchNormParameter {
    pub use_global_stats: Option<bool>,
    pub moving_average_fraction: Option<f32>,
    pub eps: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParameter {
    pub shape: Vec<BlobShape>,
}
