//! Copies pretrained caffe blobs into a constructed node's own layout.
//!
//! Blobs are positional: blob 0 is the weight, blob 1 the bias. Batch norm
//! uses blobs 0..3 as (mean accumulator, variance accumulator, scale).

use tracing::trace;

use crate::{
    layer::{
        BatchNormLayer, ConvLayer, Layer, LayerParameters, LinearLayer, NodeKind, PoolLayer,
    },
    utils::error::ConvertError,
};

use super::descriptor::LayerDescriptor;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fully-connected source blob is already `(in, out)`
    pub transposed_source: bool,
    /// Require the skipped blocks of a grouped convolution blob to be zero
    pub verify_unconnected: bool,
}

pub fn load_weights(
    src: &LayerDescriptor,
    node: &mut dyn Layer,
    options: LoadOptions,
) -> Result<(), ConvertError> {
    let kind = node.kind();
    let mismatch = || ConvertError::LayerMismatch {
        layer_type: src.layer_type.clone(),
        dest_kind: kind.to_string(),
    };

    match kind {
        NodeKind::FullyConnected => {
            let fc = node
                .as_any_mut()
                .downcast_mut::<LinearLayer>()
                .ok_or_else(mismatch)?;
            load_fully_connected(src, fc, options.transposed_source)
        }
        NodeKind::Conv | NodeKind::Deconv => {
            let conv = node
                .as_any_mut()
                .downcast_mut::<ConvLayer>()
                .ok_or_else(mismatch)?;
            load_conv(src, conv, options.verify_unconnected)
        }
        NodeKind::MaxPool | NodeKind::AvePool => {
            // caffe pooling carries no blobs, only the constant averaging weights apply
            let pool = node
                .as_any_mut()
                .downcast_mut::<PoolLayer>()
                .ok_or_else(mismatch)?;
            pool.reset_constant_weights();
            Ok(())
        }
        NodeKind::BatchNorm => {
            let bn = node
                .as_any_mut()
                .downcast_mut::<BatchNormLayer>()
                .ok_or_else(mismatch)?;
            load_batch_norm(src, bn)
        }
        NodeKind::Lrn | NodeKind::Dropout | NodeKind::Activation(_) => Err(mismatch()),
    }
}

fn load_fully_connected(
    src: &LayerDescriptor,
    fc: &mut LinearLayer,
    transposed_source: bool,
) -> Result<(), ConvertError> {
    let (in_features, out_features) = (fc.in_features, fc.out_features);
    let kind = fc.kind();
    let params = parameters(src, fc)?;

    let weights = blob(src, 0, "weight")?;
    check_size(src, kind, weights.len(), params.weight.len())?;

    let dst = params.weight.data_mut();
    if transposed_source {
        dst.copy_from_slice(weights);
    } else {
        // (out, in) -> (in, out)
        for o in 0..out_features {
            for i in 0..in_features {
                dst[i * out_features + o] = weights[o * in_features + i];
            }
        }
    }

    load_bias(src, kind, params)
}

fn load_conv(
    src: &LayerDescriptor,
    conv: &mut ConvLayer,
    verify_unconnected: bool,
) -> Result<(), ConvertError> {
    let kind = conv.kind();
    let table = conv.table().clone();
    let area = conv.kernel() * conv.kernel();
    let (in_channels, out_channels) = (table.in_channels(), table.out_channels());
    let per_group = table.in_channels_per_group();

    let weights = blob(src, 0, "weight")?;
    let params = parameters(src, conv)?;
    let compact = params.weight.len();

    if weights.len() == compact {
        // already [out, in/group, k, k]
        params.weight.data_mut().copy_from_slice(weights);
        return load_bias(src, kind, params);
    }
    let full = out_channels
        .checked_mul(in_channels)
        .and_then(|n| n.checked_mul(area));
    if full != Some(weights.len()) {
        check_size(src, kind, weights.len(), compact)?;
    }

    // full connectivity layout: every (out, in) block is stored, connected or not
    let dst = params.weight.data_mut();
    let mut cursor = 0;

    for o in 0..out_channels {
        for i in 0..in_channels {
            let block = &weights[cursor..cursor + area];
            cursor += area;

            if !table.is_connected(o, i) {
                if verify_unconnected && block.iter().any(|w| *w != 0.0) {
                    return Err(ConvertError::UnconnectedWeights {
                        layer: src.name.clone(),
                        out_channel: o,
                        in_channel: i,
                    });
                }
                trace!("{}: skipping unconnected block out={} in={}", src.name, o, i);
                continue;
            }

            let offset = (o * per_group + i % per_group) * area;
            dst[offset..offset + area].copy_from_slice(block);
        }
    }

    load_bias(src, kind, params)
}

fn load_batch_norm(src: &LayerDescriptor, bn: &mut BatchNormLayer) -> Result<(), ConvertError> {
    if src.blobs.len() != 3 {
        return Err(ConvertError::StatisticsShapeMismatch(format!(
            "caffe({}) has {} blobs, expected mean, variance and scale",
            src.name,
            src.blobs.len()
        )));
    }

    let mean = blob(src, 0, "mean")?;
    let variance = blob(src, 1, "variance")?;
    let scale = blob(src, 2, "scale")?.first().copied().ok_or_else(|| {
        ConvertError::StatisticsShapeMismatch(format!(
            "caffe({}) has an empty scale blob",
            src.name
        ))
    })?;

    // a zero scale means nothing was accumulated
    let factor = if scale == 0.0 { 0.0 } else { 1.0 / scale };
    bn.set_statistics(
        mean.iter().map(|v| v * factor).collect(),
        variance.iter().map(|v| v * factor).collect(),
    )
}

fn load_bias(
    src: &LayerDescriptor,
    kind: NodeKind,
    params: &mut LayerParameters,
) -> Result<(), ConvertError> {
    let Some(bias) = params.bias.as_mut() else {
        return Ok(());
    };

    let data = blob(src, 1, "bias")?;
    check_size(src, kind, data.len(), bias.len())?;
    bias.data_mut().copy_from_slice(data);
    Ok(())
}

fn parameters<'a>(
    src: &LayerDescriptor,
    node: &'a mut dyn Layer,
) -> Result<&'a mut LayerParameters, ConvertError> {
    let kind = node.kind();
    node.parameters_mut()
        .ok_or_else(|| ConvertError::LayerMismatch {
            layer_type: src.layer_type.clone(),
            dest_kind: kind.to_string(),
        })
}

fn blob<'a>(
    src: &'a LayerDescriptor,
    index: usize,
    role: &'static str,
) -> Result<&'a [f32], ConvertError> {
    let blob = src
        .blobs
        .get(index)
        .ok_or(ConvertError::MissingWeightBlob { index, role })?;

    if let Some(declared) = blob.declared_count()?
        && declared != blob.data.len()
    {
        return Err(ConvertError::BlobShapeMismatch {
            index,
            declared,
            found: blob.data.len(),
        });
    }
    Ok(&blob.data)
}

fn check_size(
    src: &LayerDescriptor,
    kind: NodeKind,
    found: usize,
    expected: usize,
) -> Result<(), ConvertError> {
    if found != expected {
        return Err(ConvertError::WeightSizeMismatch {
            layer: src.name.clone(),
            found,
            dest_kind: kind.to_string(),
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        importers::caffe::descriptor::{BlobProto, BlobShape},
        layer::{ConnectionTable, Padding, PoolingMethod},
        tensor::ShapeSpec,
    };

    fn descriptor(layer_type: &str, blobs: Vec<Vec<f32>>) -> LayerDescriptor {
        LayerDescriptor {
            name: "src".to_string(),
            layer_type: layer_type.to_string(),
            blobs: blobs.into_iter().map(BlobProto::from_data).collect(),
            ..Default::default()
        }
    }

    fn iota(n: usize) -> Vec<f32> {
        (0..n).map(|v| v as f32).collect()
    }

    #[test]
    fn fully_connected_is_transposed() {
        let mut fc = LinearLayer::new(ShapeSpec::flat(4), 3, true).unwrap();
        let src = descriptor("InnerProduct", vec![iota(12), vec![0.1, 0.2, 0.3]]);

        load_weights(&src, &mut fc, LoadOptions::default()).unwrap();

        let params = fc.parameters().unwrap();
        // dst[i * out + o] == src[o * in + i]
        for o in 0..3 {
            for i in 0..4 {
                assert_eq!(params.weight.data()[i * 3 + o], (o * 4 + i) as f32);
            }
        }
        assert_eq!(params.bias.as_ref().unwrap().data(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn fully_connected_size_must_match_exactly() {
        for n in [11, 13] {
            let mut fc = LinearLayer::new(ShapeSpec::flat(4), 3, false).unwrap();
            let src = descriptor("InnerProduct", vec![iota(n)]);
            let err = load_weights(&src, &mut fc, LoadOptions::default()).unwrap_err();
            assert_eq!(
                err,
                ConvertError::WeightSizeMismatch {
                    layer: "src".to_string(),
                    found: n,
                    dest_kind: "fully-connected".to_string(),
                    expected: 12,
                }
            );
        }
    }

    #[test]
    fn transposed_source_copies_directly() {
        let mut fc = LinearLayer::new(ShapeSpec::flat(2), 2, false).unwrap();
        let src = descriptor("InnerProduct", vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let options = LoadOptions {
            transposed_source: true,
            ..Default::default()
        };
        load_weights(&src, &mut fc, options).unwrap();
        assert_eq!(fc.parameters().unwrap().weight.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn missing_bias_blob_is_reported() {
        let mut fc = LinearLayer::new(ShapeSpec::flat(2), 2, true).unwrap();
        let src = descriptor("InnerProduct", vec![iota(4)]);
        assert_eq!(
            load_weights(&src, &mut fc, LoadOptions::default()).unwrap_err(),
            ConvertError::MissingWeightBlob {
                index: 1,
                role: "bias"
            }
        );
    }

    #[test]
    fn declared_shape_must_match_data() {
        let mut fc = LinearLayer::new(ShapeSpec::flat(2), 2, false).unwrap();
        let mut src = descriptor("InnerProduct", vec![iota(4)]);
        src.blobs[0].shape = Some(BlobShape { dim: vec![2, 3] });
        assert!(matches!(
            load_weights(&src, &mut fc, LoadOptions::default()),
            Err(ConvertError::BlobShapeMismatch {
                index: 0,
                declared: 6,
                found: 4
            })
        ));
    }

    fn grouped_conv() -> ConvLayer {
        // 4 inputs, 2 outputs, 2 groups, 1x1 kernel
        ConvLayer::new(
            ShapeSpec::new(3, 3, 4),
            2,
            1,
            1,
            Padding::Valid,
            ConnectionTable::grouped(2, 4, 2).unwrap(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn grouped_conv_skips_unconnected_blocks() {
        let mut conv = grouped_conv();
        // out 0 reads in 0..2, out 1 reads in 2..4
        let src = descriptor(
            "Convolution",
            vec![vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0]],
        );
        let options = LoadOptions {
            verify_unconnected: true,
            ..Default::default()
        };
        load_weights(&src, &mut conv, options).unwrap();
        assert_eq!(conv.parameters().unwrap().weight.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn non_zero_unconnected_block_is_rejected_when_verifying() {
        let src = descriptor(
            "Convolution",
            vec![vec![1.0, 2.0, 9.0, 0.0, 0.0, 0.0, 3.0, 4.0]],
        );

        let mut conv = grouped_conv();
        let verify = LoadOptions {
            verify_unconnected: true,
            ..Default::default()
        };
        assert_eq!(
            load_weights(&src, &mut conv, verify).unwrap_err(),
            ConvertError::UnconnectedWeights {
                layer: "src".to_string(),
                out_channel: 0,
                in_channel: 2
            }
        );

        let mut conv = grouped_conv();
        load_weights(&src, &mut conv, LoadOptions::default()).unwrap();
        assert_eq!(conv.parameters().unwrap().weight.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn compact_grouped_blob_copies_directly() {
        let mut conv = grouped_conv();
        let src = descriptor("Convolution", vec![iota(4)]);
        load_weights(&src, &mut conv, LoadOptions::default()).unwrap();
        assert_eq!(conv.parameters().unwrap().weight.data(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn conv_blob_of_neither_layout_fails() {
        let mut conv = grouped_conv();
        let src = descriptor("Convolution", vec![iota(6)]);
        assert!(matches!(
            load_weights(&src, &mut conv, LoadOptions::default()),
            Err(ConvertError::WeightSizeMismatch {
                found: 6,
                expected: 4,
                ..
            })
        ));
    }

    #[test]
    fn batch_norm_statistics_are_rescaled() {
        let mut bn = BatchNormLayer::new(ShapeSpec::new(1, 1, 2), 1e-5, 0.999);
        let src = descriptor(
            "BatchNorm",
            vec![vec![2.0, 4.0], vec![1.0, 1.0], vec![2.0]],
        );
        load_weights(&src, &mut bn, LoadOptions::default()).unwrap();
        assert_eq!(bn.mean(), &[1.0, 2.0]);
        assert_eq!(bn.variance(), &[0.5, 0.5]);
    }

    #[test]
    fn batch_norm_zero_scale_means_zero_statistics() {
        let mut bn = BatchNormLayer::new(ShapeSpec::new(1, 1, 2), 1e-5, 0.999);
        let src = descriptor(
            "BatchNorm",
            vec![vec![2.0, 4.0], vec![1.0, 1.0], vec![0.0]],
        );
        load_weights(&src, &mut bn, LoadOptions::default()).unwrap();
        assert_eq!(bn.mean(), &[0.0, 0.0]);
        assert_eq!(bn.variance(), &[0.0, 0.0]);
    }

    #[test]
    fn batch_norm_needs_three_blobs() {
        let mut bn = BatchNormLayer::new(ShapeSpec::new(1, 1, 2), 1e-5, 0.999);
        let src = descriptor("BatchNorm", vec![vec![2.0, 4.0], vec![1.0, 1.0]]);
        assert!(matches!(
            load_weights(&src, &mut bn, LoadOptions::default()),
            Err(ConvertError::StatisticsShapeMismatch(_))
        ));
    }

    #[test]
    fn pool_reload_restores_constant_weights() {
        let mut pool =
            PoolLayer::new(ShapeSpec::new(4, 4, 2), 2, 2, PoolingMethod::Average).unwrap();
        pool.parameters_mut().unwrap().weight.fill(7.0);
        load_weights(&descriptor("Pooling", vec![]), &mut pool, LoadOptions::default())
            .unwrap();
        assert_eq!(pool.parameters().unwrap().weight.data(), &[0.25, 0.25]);
    }

    #[test]
    fn weightless_node_is_a_mismatch() {
        let mut relu = crate::layer::ActivationLayer::new(
            crate::layer::ActivationType::ReLU,
            ShapeSpec::flat(4),
        );
        assert!(matches!(
            load_weights(&descriptor("ReLU", vec![]), &mut relu, LoadOptions::default()),
            Err(ConvertError::LayerMismatch { .. })
        ));
    }
}
