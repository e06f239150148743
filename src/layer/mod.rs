pub mod activations;
pub mod connection_table;
pub mod conv;
pub mod dropout;
pub mod factory;
pub mod layer;
pub mod linear;
pub mod normalization;
pub mod pool;

pub use activations::{ActivationLayer, ActivationType};
pub use connection_table::ConnectionTable;
pub use conv::{ConvLayer, Padding};
pub use dropout::DropoutLayer;
pub use factory::Layers;
pub use layer::{Layer, LayerParameters, NetPhase, NodeKind};
pub use linear::LinearLayer;
pub use normalization::{BatchNormLayer, LrnLayer, LrnRegion};
pub use pool::{PoolLayer, PoolingMethod};
