use std::fmt;

use crate::{
    importers::caffe::support::LayerKind,
    layer::{BatchNormLayer, DropoutLayer, Layer, NetPhase, NodeKind},
    tensor::{ShapeSpec, Tensor},
};

/// One constructed node together with the descriptor entry it came from.
#[derive(Debug)]
pub struct LayerNode {
    name: String,
    index: usize,
    layer_type: LayerKind,
    layer: Box<dyn Layer>,
}

impl LayerNode {
    pub fn new(name: &str, index: usize, layer_type: LayerKind, layer: Box<dyn Layer>) -> Self {
        Self {
            name: name.to_string(),
            index,
            layer_type,
            layer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the source entry in the descriptor's layer list
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layer_type(&self) -> LayerKind {
        self.layer_type
    }

    pub fn kind(&self) -> NodeKind {
        self.layer.kind()
    }

    pub fn in_shape(&self) -> ShapeSpec {
        self.layer.in_shape()
    }

    pub fn out_shape(&self) -> ShapeSpec {
        self.layer.out_shape()
    }

    pub fn layer(&self) -> &dyn Layer {
        self.layer.as_ref()
    }

    pub fn layer_mut(&mut self) -> &mut dyn Layer {
        self.layer.as_mut()
    }

    pub fn weight(&self) -> Option<&Tensor> {
        self.layer.parameters().map(|p| &p.weight)
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.layer.parameters().and_then(|p| p.bias.as_ref())
    }
}

/// Ordered nodes produced by one conversion.
#[derive(Debug, Default)]
pub struct LayerGraph {
    pub name: String,
    nodes: Vec<LayerNode>,
}

impl LayerGraph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: LayerNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[LayerNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [LayerNode] {
        &mut self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LayerNode> {
        self.nodes.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&LayerNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn output_shape(&self) -> Option<ShapeSpec> {
        self.nodes.last().map(LayerNode::out_shape)
    }

    pub fn total_parameters(&self) -> usize {
        self.nodes.iter().map(|n| n.layer.parameter_count()).sum()
    }

    /// Switch every dropout and batch norm node to `phase`.
    pub fn set_phase(&mut self, phase: NetPhase) {
        for node in &mut self.nodes {
            let any = node.layer.as_any_mut();
            match node.layer_type {
                LayerKind::Dropout => {
                    if let Some(dropout) = any.downcast_mut::<DropoutLayer>() {
                        dropout.set_phase(phase);
                    }
                }
                LayerKind::BatchNorm => {
                    if let Some(bn) = any.downcast_mut::<BatchNormLayer>() {
                        bn.set_phase(phase);
                    }
                }
                _ => {}
            }
        }
    }
}

impl<'a> IntoIterator for &'a LayerGraph {
    type Item = &'a LayerNode;
    type IntoIter = std::slice::Iter<'a, LayerNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Display for LayerGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nModel: {}", self.name)?;
        writeln!(f, "{:=<110}", "")?;
        writeln!(
            f,
            "{:<4} {:<16} {:<16} {:<14} {:<14} {:<10} {}",
            "ID", "Name", "Kind", "Input Shape", "Output Shape", "Params", "Config"
        )?;
        writeln!(f, "{:-<110}", "")?;

        for node in &self.nodes {
            writeln!(
                f,
                "{:<4} {:<16} {:<16} {:<14} {:<14} {:<10} {}",
                node.index,
                node.name,
                node.kind().to_string(),
                node.in_shape().to_string(),
                node.out_shape().to_string(),
                node.layer.parameter_count(),
                node.layer.config_string().unwrap_or_default()
            )?;
        }

        writeln!(f, "{:-<110}", "")?;
        writeln!(f, "Total nodes: {}", self.nodes.len())?;
        write!(f, "Total parameters: {}", self.total_parameters())
    }
}
