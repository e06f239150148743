use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    layer::{ConnectionTable, Layer, Layers, PoolingMethod},
    model::{LayerGraph, LayerNode},
    tensor::ShapeSpec,
    utils::error::{ConvertError, ImportError},
};

use super::{
    canonical::{CanonicalParams, ConvParams, canonicalize},
    config::ImportConfig,
    descriptor::{LayerDescriptor, NetDescriptor},
    shape_table::ShapeTable,
    support::{LayerKind, Support, classify, layer_match},
    weight_loader::{LoadOptions, load_weights},
};

pub struct CaffeParser;

impl CaffeParser {
    /// Convert a decoded caffe net into a sized, weight-filled layer graph.
    ///
    /// Layers are processed strictly in descriptor order; the first failure
    /// aborts the conversion.
    pub fn parse_caffe_model(
        net: &NetDescriptor,
        config: &ImportConfig,
    ) -> Result<LayerGraph, ImportError> {
        let mut shapes = ShapeTable::from_net_inputs(net)?;
        let mut rng = config.build_rng();
        let mut graph = LayerGraph::new(&net.name);

        for (index, layer) in net.layer.iter().enumerate() {
            let at = |e: ConvertError| ImportError::at(index, &layer.name, &layer.layer_type, e);

            let kind = match classify(&layer.layer_type).map_err(at)? {
                Support::Skipped => {
                    if layer.layer_type == "Input" {
                        shapes.register_input_layer(layer).map_err(at)?;
                    }
                    debug!("Skipping layer '{}' ({})", layer.name, layer.layer_type);
                    continue;
                }
                Support::Supported(kind) => kind,
            };

            let params = canonicalize(kind, layer).map_err(at)?;
            let in_shape = shapes.bottom_shape(layer).map_err(at)?;
            let node = Self::build_node(kind, layer, &params, in_shape, config, &mut rng)
                .map_err(at)?;

            debug!(
                "Built {} '{}': {} -> {}",
                node.kind(),
                layer.name,
                in_shape,
                node.out_shape()
            );

            shapes.register_top_shape(layer, node.out_shape());
            graph.push(LayerNode::new(&layer.name, index, kind, node));
        }

        info!(
            "Imported '{}': {} nodes, {} parameters",
            graph.name,
            graph.len(),
            graph.total_parameters()
        );
        Ok(graph)
    }

    /// Classify and canonicalise every layer without building anything.
    pub fn validate(net: &NetDescriptor) -> Result<(), ImportError> {
        for (index, layer) in net.layer.iter().enumerate() {
            let at = |e: ConvertError| ImportError::at(index, &layer.name, &layer.layer_type, e);
            if let Support::Supported(kind) = classify(&layer.layer_type).map_err(at)? {
                canonicalize(kind, layer).map_err(at)?;
            }
        }
        Ok(())
    }

    /// Copy the blobs of `net` into an already built graph.
    ///
    /// Each weighted layer is matched to the next node of a compatible kind.
    /// Returns how many nodes were reloaded.
    pub fn reload_weights(
        net: &NetDescriptor,
        graph: &mut LayerGraph,
        config: &ImportConfig,
    ) -> Result<usize, ImportError> {
        let mut cursor = 0;
        let mut reloaded = 0;

        for (index, layer) in net.layer.iter().enumerate() {
            let at = |e: ConvertError| ImportError::at(index, &layer.name, &layer.layer_type, e);

            let kind = match classify(&layer.layer_type).map_err(at)? {
                Support::Skipped => continue,
                Support::Supported(kind) => kind,
            };
            // pooling reloads its constant weights even without blobs
            if !kind.has_weights() || (layer.blobs.is_empty() && kind != LayerKind::Pooling) {
                continue;
            }

            let params = canonicalize(kind, layer).map_err(at)?;

            let Some(offset) = graph.nodes()[cursor..]
                .iter()
                .position(|node| layer_match(kind, node.kind()))
            else {
                warn!(
                    "No remaining node can take the weights of '{}' ({})",
                    layer.name, layer.layer_type
                );
                break;
            };
            cursor += offset;

            let node = &mut graph.nodes_mut()[cursor];
            load_weights(layer, node.layer_mut(), Self::load_options(&params, config))
                .map_err(at)?;
            debug!("Reloaded '{}' into node {}", layer.name, cursor);

            cursor += 1;
            reloaded += 1;
        }

        info!("Reloaded {} of {} nodes", reloaded, graph.len());
        Ok(reloaded)
    }

    fn build_node<R: Rng + ?Sized>(
        kind: LayerKind,
        layer: &LayerDescriptor,
        params: &CanonicalParams,
        in_shape: ShapeSpec,
        config: &ImportConfig,
        rng: &mut R,
    ) -> Result<Box<dyn Layer>, ConvertError> {
        let mut node = match params {
            CanonicalParams::Convolution(p) => Layers::conv(
                in_shape,
                p.out_channels,
                p.kernel,
                p.stride,
                p.padding,
                Self::connection_table(p, in_shape)?,
                p.has_bias,
            )?,
            CanonicalParams::Deconvolution(p) => Layers::deconv(
                in_shape,
                p.out_channels,
                p.kernel,
                p.stride,
                p.padding,
                Self::connection_table(p, in_shape)?,
                p.has_bias,
            )?,
            CanonicalParams::InnerProduct(p) => {
                Layers::linear(in_shape, p.out_channels, p.has_bias)?
            }
            CanonicalParams::Pooling(p) => match p.method {
                PoolingMethod::Max => Layers::max_pool(in_shape, p.kernel, p.stride)?,
                PoolingMethod::Average => Layers::ave_pool(in_shape, p.kernel, p.stride)?,
            },
            CanonicalParams::Lrn(p) => {
                Layers::lrn(in_shape, p.local_size, p.alpha, p.beta, p.k, p.region)
            }
            CanonicalParams::Dropout(p) => Layers::dropout(in_shape, p.rate),
            CanonicalParams::BatchNorm(p) => Layers::batch_norm(in_shape, p.epsilon, p.momentum),
            CanonicalParams::Activation(activation) => Layers::activation(*activation, in_shape),
        };

        if layer.blobs.is_empty() {
            Self::fill_weights(params, node.as_mut(), config, rng)?;
        } else if kind.has_weights() {
            load_weights(layer, node.as_mut(), Self::load_options(params, config))?;
        } else {
            warn!(
                "Ignoring {} blobs on '{}', {} takes no weights",
                layer.blobs.len(),
                layer.name,
                layer.layer_type
            );
        }

        Ok(node)
    }

    fn connection_table(
        p: &ConvParams,
        in_shape: ShapeSpec,
    ) -> Result<ConnectionTable, ConvertError> {
        ConnectionTable::grouped(p.groups, in_shape.depth, p.out_channels)
    }

    /// Run the configured fillers over a node built without pretrained blobs.
    fn fill_weights<R: Rng + ?Sized>(
        params: &CanonicalParams,
        node: &mut dyn Layer,
        config: &ImportConfig,
        rng: &mut R,
    ) -> Result<(), ConvertError> {
        let (weight_filler, bias_filler) = match params {
            CanonicalParams::Convolution(p) | CanonicalParams::Deconvolution(p) => {
                (&p.weight_filler, &p.bias_filler)
            }
            CanonicalParams::InnerProduct(p) => (&p.weight_filler, &p.bias_filler),
            // average pooling keeps its constant weights
            _ => return Ok(()),
        };

        if let Some(parameters) = node.parameters_mut() {
            parameters.initialise(
                weight_filler.as_ref().unwrap_or(&config.default_weight_init),
                bias_filler.as_ref().unwrap_or(&config.default_bias_init),
                rng,
            )?;
        }
        Ok(())
    }

    fn load_options(params: &CanonicalParams, config: &ImportConfig) -> LoadOptions {
        LoadOptions {
            transposed_source: matches!(
                params,
                CanonicalParams::InnerProduct(p) if p.transposed_source
            ),
            verify_unconnected: config.verify_unconnected_weights,
        }
    }
}
