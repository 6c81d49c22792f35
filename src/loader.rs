use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::builder::{GraphBuilder, SliceArgs};
use crate::error::GraphError;
use crate::graph::{
    DataType, GraphContext, GraphOptions, NodeOptions, OnnxGraph, TensorData, TensorValue,
};

/// JSON document declaring graph inputs, constants and the slices to build
/// on top of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphDescription {
    #[serde(default)]
    pub options: GraphOptions,
    #[serde(default)]
    pub inputs: Vec<InputDescription>,
    #[serde(default)]
    pub constants: Vec<ConstantDescription>,
    #[serde(default)]
    pub slices: Vec<SliceDescription>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputDescription {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub shape: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantDescription {
    pub name: String,
    #[serde(default = "default_constant_type")]
    pub data_type: DataType,
    pub values: Vec<serde_json::Number>,
    #[serde(default)]
    pub dims: Option<Vec<i64>>,
}

fn default_constant_type() -> DataType {
    DataType::Int64
}

#[derive(Debug, Clone, Deserialize)]
pub struct SliceDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(flatten)]
    pub args: SliceArgs,
}

impl ConstantDescription {
    fn to_tensor(&self) -> Result<TensorValue, GraphError> {
        let invalid = |reason: String| GraphError::ConversionFailed {
            format: "graph-description".to_string(),
            reason: format!("constant `{}`: {}", self.name, reason),
        };
        let data = match self.data_type {
            DataType::Int64 => TensorData::Int64(
                self.values
                    .iter()
                    .map(|v| v.as_i64().ok_or_else(|| invalid(format!("{} is not an int64", v))))
                    .collect::<Result<_, _>>()?,
            ),
            DataType::Int32 => TensorData::Int32(
                self.values
                    .iter()
                    .map(|v| {
                        v.as_i64()
                            .and_then(|v| i32::try_from(v).ok())
                            .ok_or_else(|| invalid(format!("{} is not an int32", v)))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            DataType::Float32 => TensorData::Float32(
                self.values
                    .iter()
                    .map(|v| {
                        v.as_f64()
                            .map(|v| v as f32)
                            .ok_or_else(|| invalid(format!("{} is not a float", v)))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            other => return Err(invalid(format!("{:?} constants are not supported", other))),
        };
        let dims = self
            .dims
            .clone()
            .unwrap_or_else(|| vec![self.values.len() as i64]);
        if let Some(dim) = dims.iter().find(|dim| **dim < 0) {
            return Err(invalid(format!("dims {:?} contain negative size {}", dims, dim)));
        }
        let element_count = dims
            .iter()
            .try_fold(1i64, |count, dim| count.checked_mul(*dim))
            .ok_or_else(|| invalid(format!("dims {:?} overflow the element count", dims)))?;
        if element_count != self.values.len() as i64 {
            return Err(invalid(format!(
                "dims {:?} do not match {} values",
                dims,
                self.values.len()
            )));
        }
        Ok(TensorValue { dims, data })
    }
}

pub fn load_description_from_path(path: impl AsRef<Path>) -> Result<GraphDescription, GraphError> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| GraphError::io(path_ref, err))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Populates a graph from `description`, building every slice in order.
///
/// `opset_override` replaces the opset declared in the description.
pub fn build_graph(
    description: GraphDescription,
    opset_override: Option<i64>,
) -> Result<OnnxGraph, GraphError> {
    let mut options = description.options;
    if let Some(opset) = opset_override {
        options.opset = opset;
    }
    let mut graph = OnnxGraph::new(options)?;

    for input in description.inputs {
        graph.add_input(input.name, input.data_type, input.shape)?;
    }
    for constant in &description.constants {
        graph.make_const(constant.name.clone(), constant.to_tensor()?)?;
    }

    let mut builder = GraphBuilder::new(&mut graph);
    for slice in description.slices {
        let options = NodeOptions {
            name: slice.name,
            dtypes: slice.data_type.map(|dtype| vec![dtype]),
            ..Default::default()
        };
        let output = builder.make_slice(slice.args, options)?;
        debug!("built slice producing {}", output);
    }

    for output in description.outputs {
        graph.add_output(output)?;
    }
    Ok(graph)
}
