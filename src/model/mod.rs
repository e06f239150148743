pub mod layer_graph;

pub use layer_graph::{LayerGraph, LayerNode};
