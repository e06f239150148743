//! caffe-import - turns decoded caffe net descriptors into sized, weight-filled layer graphs
//!
//! Parameters are canonicalised, shapes propagated in descriptor order and
//! pretrained blobs transcoded into each node's own layout. Anything outside
//! the supported layer set fails the whole conversion.

mod importers;

mod layer;

mod model;

mod tensor;

mod utils;

mod weight_initialiser;

pub use importers::caffe::{
    CaffeParser, ImportConfig,
    canonical::{
        BatchNormParams, CanonicalParams, ConvParams, DropoutParams, InnerProductParams,
        LrnParams, PoolParams, canonicalize,
    },
    descriptor::{
        BatchNormParameter, BlobProto, BlobShape, ConvolutionParameter, DropoutParameter,
        FillerParameter, InnerProductParameter, InputParameter, LRNParameter, LayerDescriptor,
        NetDescriptor, NormRegion, PoolMethod, PoolingParameter, VarianceNorm,
    },
    shape_table::ShapeTable,
    support::{
        LayerKind, SKIPPED_LAYER_TYPES, Support, classify, layer_match, layer_skipped,
        layer_supported,
    },
    weight_loader::{LoadOptions, load_weights},
};
pub use layer::{
    ActivationLayer, ActivationType, BatchNormLayer, ConnectionTable, ConvLayer, DropoutLayer,
    Layer, LayerParameters, Layers, LinearLayer, LrnLayer, LrnRegion, NetPhase, NodeKind,
    Padding, PoolLayer, PoolingMethod,
};
pub use model::{LayerGraph, LayerNode};
pub use tensor::{ShapeSpec, Tensor, TensorDesc};
pub use utils::error::{ConvertError, ImportError};
pub use weight_initialiser::WeightInit;
