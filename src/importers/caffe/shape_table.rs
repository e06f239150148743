use std::collections::HashMap;

use crate::{
    tensor::ShapeSpec,
    utils::error::{ConvertError, ImportError},
};

use super::descriptor::{BlobShape, LayerDescriptor, NetDescriptor};

/// Blob name to shape, filled in descriptor order during one conversion.
#[derive(Clone, Debug, Default)]
pub struct ShapeTable {
    shapes: HashMap<String, ShapeSpec>,
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with the net-level inputs.
    ///
    /// `input[i]` takes `input_shape[i]`, the single shared `input_shape`, or
    /// the legacy `input_dim[4*i..4*i+4]`, in that order of preference.
    pub fn from_net_inputs(net: &NetDescriptor) -> Result<Self, ImportError> {
        let mut table = Self::new();

        for (i, name) in net.input.iter().enumerate() {
            let dims = if let Some(shape) = net.input_shape.get(i) {
                shape.dim.as_slice()
            } else if net.input_shape.len() == 1 {
                net.input_shape[0].dim.as_slice()
            } else if let Some(legacy) = net.input_dim.get(4 * i..4 * i + 4) {
                legacy
            } else {
                return Err(ImportError::net_input(
                    name,
                    ConvertError::MissingRequiredParameter("input_shape"),
                ));
            };

            let shape = ShapeSpec::from_dims(dims).map_err(|e| ImportError::net_input(name, e))?;
            table.register(name, shape);
        }

        Ok(table)
    }

    pub fn lookup(&self, name: &str) -> Result<ShapeSpec, ConvertError> {
        self.shapes
            .get(name)
            .copied()
            .ok_or_else(|| ConvertError::UnknownInput(name.to_string()))
    }

    /// Last write wins, so in-place layers simply overwrite their bottom.
    pub fn register(&mut self, name: &str, shape: ShapeSpec) {
        self.shapes.insert(name.to_string(), shape);
    }

    /// Input shape of a layer, looked up through its first bottom.
    pub fn bottom_shape(&self, layer: &LayerDescriptor) -> Result<ShapeSpec, ConvertError> {
        let bottom = layer
            .bottom
            .first()
            .ok_or(ConvertError::MissingRequiredParameter("bottom"))?;
        self.lookup(bottom)
    }

    /// Register a layer's output under every top, or under its name when it has none.
    pub fn register_top_shape(&mut self, layer: &LayerDescriptor, shape: ShapeSpec) {
        if layer.top.is_empty() {
            self.register(&layer.name, shape);
        }
        for top in &layer.top {
            self.register(top, shape);
        }
    }

    /// Register the shapes an `Input` layer declares for its tops.
    pub fn register_input_layer(&mut self, layer: &LayerDescriptor) -> Result<(), ConvertError> {
        let Some(param) = &layer.input_param else {
            return Ok(());
        };
        let shapes: &[BlobShape] = &param.shape;

        for (i, top) in layer.top.iter().enumerate() {
            let shape = match (shapes.get(i), shapes) {
                (Some(shape), _) => shape,
                (None, [shared]) => shared,
                (None, _) => {
                    return Err(ConvertError::MissingRequiredParameter("input_param.shape"));
                }
            };
            self.register(top, ShapeSpec::from_dims(&shape.dim)?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::caffe::descriptor::InputParameter;

    fn layer(name: &str, bottom: &[&str], top: &[&str]) -> LayerDescriptor {
        LayerDescriptor {
            name: name.to_string(),
            bottom: bottom.iter().map(|s| s.to_string()).collect(),
            top: top.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn lookup_of_unregistered_blob_fails() {
        let table = ShapeTable::new();
        assert_eq!(
            table.lookup("data").unwrap_err(),
            ConvertError::UnknownInput("data".to_string())
        );
    }

    #[test]
    fn register_overwrites() {
        let mut table = ShapeTable::new();
        table.register("x", ShapeSpec::new(4, 4, 1));
        table.register("x", ShapeSpec::new(2, 2, 8));
        assert_eq!(table.lookup("x").unwrap(), ShapeSpec::new(2, 2, 8));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn net_inputs_from_shape_and_legacy_dims() {
        let net = NetDescriptor {
            input: vec!["data".to_string()],
            input_shape: vec![BlobShape {
                dim: vec![1, 3, 32, 28],
            }],
            ..Default::default()
        };
        let table = ShapeTable::from_net_inputs(&net).unwrap();
        assert_eq!(table.lookup("data").unwrap(), ShapeSpec::new(28, 32, 3));

        let legacy = NetDescriptor {
            input: vec!["a".to_string(), "b".to_string()],
            input_dim: vec![1, 1, 28, 28, 1, 10, 1, 1],
            ..Default::default()
        };
        let table = ShapeTable::from_net_inputs(&legacy).unwrap();
        assert_eq!(table.lookup("a").unwrap(), ShapeSpec::new(28, 28, 1));
        assert_eq!(table.lookup("b").unwrap(), ShapeSpec::new(1, 1, 10));
    }

    #[test]
    fn net_input_without_shape_fails_unpositioned() {
        let net = NetDescriptor {
            input: vec!["data".to_string()],
            ..Default::default()
        };
        let err = ShapeTable::from_net_inputs(&net).unwrap_err();
        assert_eq!(err.index, None);
        assert_eq!(err.name, "data");
    }

    #[test]
    fn tops_fall_back_to_layer_name() {
        let mut table = ShapeTable::new();
        table.register("data", ShapeSpec::new(8, 8, 3));

        let named = layer("conv1", &["data"], &[]);
        let shape = table.bottom_shape(&named).unwrap();
        table.register_top_shape(&named, ShapeSpec::new(6, 6, 4));
        assert_eq!(shape, ShapeSpec::new(8, 8, 3));
        assert_eq!(table.lookup("conv1").unwrap(), ShapeSpec::new(6, 6, 4));

        let split = layer("split", &["conv1"], &["s1", "s2"]);
        table.register_top_shape(&split, ShapeSpec::new(6, 6, 4));
        assert!(table.lookup("s1").is_ok());
        assert!(table.lookup("s2").is_ok());
        assert!(table.lookup("split").is_err());
    }

    #[test]
    fn missing_bottom_is_reported() {
        let table = ShapeTable::new();
        assert_eq!(
            table.bottom_shape(&layer("orphan", &[], &[])).unwrap_err(),
            ConvertError::MissingRequiredParameter("bottom")
        );
    }

    #[test]
    fn input_layer_registers_its_tops() {
        let mut table = ShapeTable::new();
        let mut input = layer("input", &[], &["data", "label"]);
        input.input_param = Some(InputParameter {
            shape: vec![
                BlobShape {
                    dim: vec![64, 1, 28, 28],
                },
                BlobShape { dim: vec![64, 1] },
            ],
        });

        table.register_input_layer(&input).unwrap();
        assert_eq!(table.lookup("data").unwrap(), ShapeSpec::new(28, 28, 1));
        assert_eq!(table.lookup("label").unwrap(), ShapeSpec::flat(1));
    }
}
