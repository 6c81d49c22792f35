//! Opset-aware construction of composite ONNX nodes.
//!
//! `Slice` changed its schema at opset 10: `starts`, `ends` and `axes` moved
//! from attributes to inputs and an optional `steps` input was added.
//! [`GraphBuilder::make_slice`] accepts the same logical operands for every
//! opset and emits the layout the graph's opset expects.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{Attribute, DataType, GraphContext, NodeOptions, NodeRequest, TensorValue};

pub const SLICE_OP_TYPE: &str = "Slice";
const CONST_SLICE_PREFIX: &str = "const_slice";

/// Value supplied for one slice parameter.
///
/// From JSON a string is a reference to a graph value, an integer array is a
/// literal list and `null` or a missing key is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Reference(String),
    Literal(Vec<i64>),
    #[default]
    Absent,
}

impl Operand {
    pub fn is_absent(&self) -> bool {
        matches!(self, Operand::Absent)
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Reference(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Reference(name)
    }
}

impl From<Vec<i64>> for Operand {
    fn from(values: Vec<i64>) -> Self {
        Operand::Literal(values)
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Named operands of a slice request.
///
/// Keys other than the slice parameters land in `extra`; they are reported
/// and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceArgs {
    #[serde(default)]
    pub data: Operand,
    #[serde(default)]
    pub starts: Operand,
    #[serde(default)]
    pub ends: Operand,
    #[serde(default)]
    pub axes: Operand,
    #[serde(default)]
    pub steps: Operand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SliceArgs {
    pub fn new(
        data: impl Into<Operand>,
        starts: impl Into<Operand>,
        ends: impl Into<Operand>,
    ) -> Self {
        Self {
            data: data.into(),
            starts: starts.into(),
            ends: ends.into(),
            ..Default::default()
        }
    }

    pub fn with_axes(mut self, axes: impl Into<Operand>) -> Self {
        self.axes = axes.into();
        self
    }

    pub fn with_steps(mut self, steps: impl Into<Operand>) -> Self {
        self.steps = steps.into();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = Some(outputs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Slice-1: bounds are attributes.
    Attribute,
    /// Slice-10 and later: bounds are inputs.
    Input,
}

impl SchemaMode {
    pub const INPUT_MODE_OPSET: i64 = 10;

    pub fn for_opset(opset: i64) -> Self {
        if opset < Self::INPUT_MODE_OPSET {
            SchemaMode::Attribute
        } else {
            SchemaMode::Input
        }
    }
}

/// Fully resolved slice operands in the shape one schema version expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceLayout {
    Attributes {
        data: String,
        starts: Vec<i64>,
        ends: Vec<i64>,
        axes: Option<Vec<i64>>,
    },
    Inputs {
        data: String,
        starts: String,
        ends: String,
        axes: Option<String>,
        steps: Option<String>,
    },
}

impl SliceLayout {
    pub fn into_request(self) -> NodeRequest {
        let mut attributes = BTreeMap::new();
        let inputs = match self {
            SliceLayout::Attributes {
                data,
                starts,
                ends,
                axes,
            } => {
                attributes.insert("starts".to_string(), Attribute::Ints(starts));
                attributes.insert("ends".to_string(), Attribute::Ints(ends));
                if let Some(axes) = axes {
                    attributes.insert("axes".to_string(), Attribute::Ints(axes));
                }
                vec![data]
            }
            SliceLayout::Inputs {
                data,
                starts,
                ends,
                axes,
                steps,
            } => {
                let mut inputs = vec![
                    data,
                    starts,
                    ends,
                    axes.unwrap_or_default(),
                    steps.unwrap_or_default(),
                ];
                trim_trailing_placeholders(&mut inputs);
                inputs
            }
        };
        NodeRequest {
            op_type: SLICE_OP_TYPE.to_string(),
            inputs,
            attributes,
        }
    }
}

/// Omitted trailing optional inputs need no placeholder in ONNX.
fn trim_trailing_placeholders(inputs: &mut Vec<String>) {
    while inputs.last().is_some_and(|input| input.is_empty()) {
        inputs.pop();
    }
}

fn require<T>(value: Option<T>, operand: &'static str) -> Result<T, GraphError> {
    value.ok_or(GraphError::MissingOperand { operand })
}

/// Helper for building nodes whose schema depends on the graph's opset.
pub struct GraphBuilder<'g, G: GraphContext + ?Sized> {
    graph: &'g mut G,
}

impl<'g, G: GraphContext + ?Sized> GraphBuilder<'g, G> {
    pub fn new(graph: &'g mut G) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &G {
        &*self.graph
    }

    /// Emits one `Slice` node and returns the name of its first output.
    ///
    /// `args.outputs`, when given, takes precedence over `options.outputs`.
    pub fn make_slice(
        &mut self,
        args: SliceArgs,
        options: NodeOptions,
    ) -> Result<String, GraphError> {
        let SliceArgs {
            data,
            starts,
            ends,
            axes,
            steps,
            outputs,
            extra,
        } = args;

        let opset = self.graph.opset();
        let mode = SchemaMode::for_opset(opset);
        debug!("make_slice: opset {} uses {:?} layout", opset, mode);

        for (operand, value) in [("data", &data), ("starts", &starts), ("ends", &ends)] {
            if value.is_absent() {
                return Err(GraphError::MissingOperand { operand });
            }
        }

        let mut unused: Vec<String> = extra.into_keys().collect();
        if mode == SchemaMode::Attribute && !steps.is_absent() {
            unused.push("steps".to_string());
        }
        for key in &unused {
            warn!(
                "make_slice: argument `{}` is not used by Slice at opset {}",
                key, opset
            );
        }

        let layout = match mode {
            SchemaMode::Attribute => {
                let data = match data {
                    Operand::Reference(name) => name,
                    Operand::Literal(_) => {
                        return Err(GraphError::NotAReference { operand: "data" });
                    }
                    Operand::Absent => return Err(GraphError::MissingOperand { operand: "data" }),
                };
                SliceLayout::Attributes {
                    data,
                    starts: require(self.convert_to_attribute(starts, "starts", false)?, "starts")?,
                    ends: require(self.convert_to_attribute(ends, "ends", false)?, "ends")?,
                    axes: self.convert_to_attribute(axes, "axes", true)?,
                }
            }
            SchemaMode::Input => {
                // Checked before any literal is materialized as a constant.
                self.check_uniform_dtypes(&[
                    ("starts", &starts),
                    ("ends", &ends),
                    ("axes", &axes),
                    ("steps", &steps),
                ])?;
                SliceLayout::Inputs {
                    data: require(self.convert_to_input(data, "data", false)?, "data")?,
                    starts: require(self.convert_to_input(starts, "starts", false)?, "starts")?,
                    ends: require(self.convert_to_input(ends, "ends", false)?, "ends")?,
                    axes: self.convert_to_input(axes, "axes", true)?,
                    steps: self.convert_to_input(steps, "steps", true)?,
                }
            }
        };

        let request = layout.into_request();
        let non_empty = |outputs: &Vec<String>| !outputs.is_empty();
        let options = NodeOptions {
            outputs: outputs.filter(non_empty).or(options.outputs.filter(non_empty)),
            ..options
        };
        let node = self.graph.make_node(request, options)?;
        node.outputs
            .first()
            .cloned()
            .ok_or_else(|| GraphError::NodeWithoutOutputs {
                name: node.name.clone(),
            })
    }

    /// Resolves `operand` to the name of a graph value, materializing
    /// literal lists as new INT64 constants.
    pub fn convert_to_input(
        &mut self,
        operand: Operand,
        role: &'static str,
        is_optional: bool,
    ) -> Result<Option<String>, GraphError> {
        match operand {
            Operand::Absent if is_optional => Ok(None),
            Operand::Absent => Err(GraphError::MissingOperand { operand: role }),
            Operand::Reference(name) => Ok(Some(name)),
            Operand::Literal(values) => {
                let name = self.graph.make_name(CONST_SLICE_PREFIX);
                let node = self
                    .graph
                    .make_const(name, TensorValue::from_ints(values))?;
                let output = node
                    .outputs
                    .first()
                    .cloned()
                    .ok_or_else(|| GraphError::NodeWithoutOutputs {
                        name: node.name.clone(),
                    })?;
                debug!("make_slice: `{}` materialized as constant {}", role, output);
                Ok(Some(output))
            }
        }
    }

    /// Resolves `operand` to a literal list, reading references back from
    /// the constant node that produces them.
    pub fn convert_to_attribute(
        &self,
        operand: Operand,
        role: &'static str,
        is_optional: bool,
    ) -> Result<Option<Vec<i64>>, GraphError> {
        match operand {
            Operand::Absent if is_optional => Ok(None),
            Operand::Absent => Err(GraphError::MissingOperand { operand: role }),
            Operand::Literal(values) => Ok(Some(values)),
            Operand::Reference(name) => self
                .graph
                .get_node_by_output(&name)
                .and_then(|node| node.get_tensor_value_as_list())
                .map(Some)
                .ok_or(GraphError::NotALiteralList {
                    operand: role,
                    value: name,
                }),
        }
    }

    /// Every connected operand after `data` must share the element type of
    /// `starts`. Literal lists count as INT64, the type they are stored as.
    fn check_uniform_dtypes(
        &self,
        operands: &[(&'static str, &Operand)],
    ) -> Result<(), GraphError> {
        let mut connected = operands.iter().filter_map(|(role, operand)| match operand {
            Operand::Absent => None,
            Operand::Reference(name) if name.is_empty() => None,
            Operand::Reference(name) => Some((name.clone(), self.graph.get_dtype(name))),
            Operand::Literal(_) => Some((role.to_string(), Some(DataType::Int64))),
        });
        let Some((_, expected)) = connected.next() else {
            return Ok(());
        };
        for (value, found) in connected {
            if found != expected {
                return Err(GraphError::DataTypeMismatch {
                    op_type: SLICE_OP_TYPE.to_string(),
                    value,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::graph::{DataType, Node, OnnxGraph, TensorData};

    fn graph(opset: i64) -> OnnxGraph {
        let mut graph = OnnxGraph::with_opset(opset).unwrap();
        graph
            .add_input("x", DataType::Float32, Some(vec![4, 4]))
            .unwrap();
        for (name, values) in [
            ("starts_c", vec![0]),
            ("ends_c", vec![2]),
            ("axes_c", vec![1]),
            ("steps_c", vec![1]),
        ] {
            graph
                .make_const(name.to_string(), TensorValue::from_ints(values))
                .unwrap();
        }
        graph
            .make_node(
                NodeRequest {
                    op_type: "Shape".to_string(),
                    inputs: vec!["x".to_string()],
                    attributes: BTreeMap::new(),
                },
                NodeOptions {
                    outputs: Some(vec!["x_shape".to_string()]),
                    dtypes: Some(vec![DataType::Int64]),
                    ..Default::default()
                },
            )
            .unwrap();
        graph
    }

    fn slice_node<'a>(graph: &'a OnnxGraph, output: &str) -> &'a Node {
        let node = graph.get_node_by_output(output).unwrap();
        assert_eq!(node.op_type, SLICE_OP_TYPE);
        node
    }

    #[test]
    fn attribute_mode_uses_single_input_and_ints() {
        let mut graph = graph(9);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new("x", vec![0], vec![2]), NodeOptions::default())
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs, vec!["x".to_string()]);
        assert_eq!(node.attributes.get("starts"), Some(&Attribute::Ints(vec![0])));
        assert_eq!(node.attributes.get("ends"), Some(&Attribute::Ints(vec![2])));
        assert!(!node.attributes.contains_key("axes"));
        assert_eq!(node.outputs[0], output);
    }

    #[test]
    fn attribute_mode_reads_constant_references() {
        let mut graph = graph(9);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_c", "ends_c").with_axes("axes_c"),
                NodeOptions::default(),
            )
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.attributes.get("starts"), Some(&Attribute::Ints(vec![0])));
        assert_eq!(node.attributes.get("axes"), Some(&Attribute::Ints(vec![1])));
    }

    #[test]
    fn attribute_mode_rejects_non_constant_references() {
        let mut graph = graph(9);
        let node_count = graph.nodes().len();
        let err = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", vec![0], vec![2]).with_axes("x_shape"),
                NodeOptions::default(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            GraphError::NotALiteralList { operand: "axes", ref value } if value == "x_shape"
        ));
        assert_eq!(graph.nodes().len(), node_count);
    }

    #[test]
    fn attribute_mode_rejects_unknown_references() {
        let mut graph = graph(9);
        let err = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new("x", "nowhere", vec![2]), NodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::NotALiteralList { operand: "starts", .. }));
    }

    #[test]
    fn attribute_mode_requires_data_reference() {
        let mut graph = graph(9);
        let err = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new(vec![1, 2, 3], vec![0], vec![2]), NodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::NotAReference { operand: "data" }));
    }

    #[test]
    fn attribute_mode_ignores_steps() {
        let mut graph = graph(9);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", vec![0], vec![2]).with_steps(vec![2]),
                NodeOptions::default(),
            )
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs.len(), 1);
        assert!(!node.attributes.contains_key("steps"));
    }

    #[test]
    fn input_mode_without_optional_inputs_has_three_inputs() {
        let mut graph = graph(10);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new("x", "starts_c", "ends_c"), NodeOptions::default())
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs, vec!["x", "starts_c", "ends_c"]);
        assert!(node.attributes.is_empty());
    }

    #[test]
    fn input_mode_keeps_inner_placeholder() {
        let mut graph = graph(13);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_c", "ends_c").with_steps("steps_c"),
                NodeOptions::default(),
            )
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs, vec!["x", "starts_c", "ends_c", "", "steps_c"]);
    }

    #[test]
    fn input_mode_trims_trailing_steps_placeholder() {
        let mut graph = graph(13);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_c", "ends_c").with_axes("axes_c"),
                NodeOptions::default(),
            )
            .unwrap();

        let node = slice_node(&graph, &output);
        assert_eq!(node.inputs, vec!["x", "starts_c", "ends_c", "axes_c"]);
    }

    #[test]
    fn input_mode_materializes_literal_lists() {
        let mut graph = graph(11);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", vec![0, 0], vec![2, 2]),
                NodeOptions::default(),
            )
            .unwrap();

        let node = slice_node(&graph, &output).clone();
        assert_eq!(node.inputs.len(), 3);
        assert!(node.inputs[1].starts_with("const_slice__"));
        let starts = graph.get_node_by_output(&node.inputs[1]).unwrap();
        assert!(starts.is_const());
        assert_eq!(starts.get_tensor_value_as_list(), Some(vec![0, 0]));
        assert_eq!(graph.get_dtype(&node.inputs[1]), Some(DataType::Int64));
    }

    #[test]
    fn input_mode_rejects_mixed_dtypes() {
        let mut graph = graph(10);
        graph
            .make_const(
                "ends_i32".to_string(),
                TensorValue {
                    dims: vec![1],
                    data: TensorData::Int32(vec![2]),
                },
            )
            .unwrap();
        let node_count = graph.nodes().len();

        let err = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new("x", "starts_c", "ends_i32"), NodeOptions::default())
            .unwrap_err();

        match err {
            GraphError::DataTypeMismatch {
                value,
                expected,
                found,
                ..
            } => {
                assert_eq!(value, "ends_i32");
                assert_eq!(expected, Some(DataType::Int64));
                assert_eq!(found, Some(DataType::Int32));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.nodes().len(), node_count);
    }

    fn graph_with_int32_bounds(opset: i64) -> OnnxGraph {
        let mut graph = graph(opset);
        for name in ["ends_i32", "axes_i32", "steps_i32"] {
            graph
                .make_const(
                    name.to_string(),
                    TensorValue {
                        dims: vec![1],
                        data: TensorData::Int32(vec![1]),
                    },
                )
                .unwrap();
        }
        graph
    }

    #[test]
    fn input_mode_rejects_literal_next_to_int32_reference_without_constants() {
        let mut graph = graph_with_int32_bounds(13);
        let node_count = graph.nodes().len();

        let err = GraphBuilder::new(&mut graph)
            .make_slice(SliceArgs::new("x", vec![0], "ends_i32"), NodeOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            GraphError::DataTypeMismatch {
                ref value,
                expected: Some(DataType::Int64),
                found: Some(DataType::Int32),
                ..
            } if value == "ends_i32"
        ));
        assert_eq!(graph.nodes().len(), node_count);
        assert!(graph.nodes().iter().all(|node| !node.name.starts_with("const_slice")));
    }

    #[test]
    fn input_mode_checks_axes_and_steps_dtypes() {
        let cases = [
            (
                SliceArgs::new("x", "starts_c", "ends_c").with_axes("axes_i32"),
                "axes_i32",
            ),
            (
                SliceArgs::new("x", "starts_c", "ends_c").with_steps("steps_i32"),
                "steps_i32",
            ),
            (
                SliceArgs::new("x", vec![0], vec![2])
                    .with_axes(vec![1])
                    .with_steps("steps_i32"),
                "steps_i32",
            ),
        ];
        for (args, mismatched) in cases {
            let mut graph = graph_with_int32_bounds(13);
            let node_count = graph.nodes().len();
            let err = GraphBuilder::new(&mut graph)
                .make_slice(args, NodeOptions::default())
                .unwrap_err();
            assert!(
                matches!(err, GraphError::DataTypeMismatch { ref value, .. } if value == mismatched),
                "unexpected error: {err:?}"
            );
            assert_eq!(graph.nodes().len(), node_count);
        }
    }

    #[test]
    fn input_mode_accepts_uniform_int32_references() {
        let mut graph = graph_with_int32_bounds(13);
        graph
            .make_const(
                "starts_i32".to_string(),
                TensorValue {
                    dims: vec![1],
                    data: TensorData::Int32(vec![0]),
                },
            )
            .unwrap();
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_i32", "ends_i32")
                    .with_axes("axes_i32")
                    .with_steps("steps_i32"),
                NodeOptions::default(),
            )
            .unwrap();
        assert_eq!(slice_node(&graph, &output).inputs.len(), 5);
    }

    #[test]
    fn empty_output_lists_fall_back_to_generated_names() {
        let mut graph = graph(13);
        let node_count = graph.nodes().len();
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_c", "ends_c"),
                NodeOptions {
                    outputs: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(output.starts_with("Slice__"));
        assert_eq!(slice_node(&graph, &output).outputs, vec![output.clone()]);
        assert_eq!(graph.nodes().len(), node_count + 1);
    }

    #[test]
    fn missing_required_operand_emits_nothing() {
        for opset in [9, 13] {
            let mut graph = graph(opset);
            let node_count = graph.nodes().len();
            let args = SliceArgs {
                data: "x".into(),
                starts: vec![0].into(),
                ..Default::default()
            };
            let err = GraphBuilder::new(&mut graph)
                .make_slice(args, NodeOptions::default())
                .unwrap_err();
            assert!(matches!(err, GraphError::MissingOperand { operand: "ends" }));
            assert_eq!(graph.nodes().len(), node_count);
        }
    }

    #[test]
    fn unused_arguments_do_not_abort() {
        let mut graph = graph(13);
        let args = SliceArgs::new("x", "starts_c", "ends_c")
            .with_extra("keepdims", serde_json::json!(1));
        assert!(GraphBuilder::new(&mut graph)
            .make_slice(args, NodeOptions::default())
            .is_ok());
    }

    #[test]
    fn honours_requested_outputs_and_name() {
        let mut graph = graph(13);
        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", "starts_c", "ends_c").with_outputs(["y"]),
                NodeOptions {
                    name: Some("slice_y".to_string()),
                    dtypes: Some(vec![DataType::Float32]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(output, "y");
        let node = slice_node(&graph, "y");
        assert_eq!(node.name, "slice_y");
        assert_eq!(graph.get_dtype("y"), Some(DataType::Float32));
    }

    #[test]
    fn repeated_calls_build_identical_layouts() {
        for opset in [9, 13] {
            let mut graph = graph(opset);
            let args = SliceArgs::new("x", "starts_c", "ends_c").with_axes("axes_c");
            let mut builder = GraphBuilder::new(&mut graph);
            let first = builder.make_slice(args.clone(), NodeOptions::default()).unwrap();
            let second = builder.make_slice(args, NodeOptions::default()).unwrap();
            assert_ne!(first, second);

            let first = slice_node(&graph, &first);
            let second = slice_node(&graph, &second);
            assert_ne!(first.name, second.name);
            assert_eq!(first.inputs, second.inputs);
            assert_eq!(first.attributes, second.attributes);
        }
    }

    #[test]
    fn converts_operands_to_inputs_and_attributes() {
        let mut graph = graph(13);
        let mut builder = GraphBuilder::new(&mut graph);

        assert_eq!(builder.convert_to_input(Operand::Absent, "axes", true).unwrap(), None);
        assert!(matches!(
            builder.convert_to_input(Operand::Absent, "starts", false),
            Err(GraphError::MissingOperand { operand: "starts" })
        ));
        assert_eq!(
            builder.convert_to_input("x".into(), "data", false).unwrap(),
            Some("x".to_string())
        );

        assert_eq!(
            builder.convert_to_attribute(vec![3].into(), "ends", false).unwrap(),
            Some(vec![3])
        );
        assert_eq!(
            builder.convert_to_attribute("steps_c".into(), "steps", false).unwrap(),
            Some(vec![1])
        );
        assert_eq!(builder.convert_to_attribute(Operand::Absent, "axes", true).unwrap(), None);
        assert!(matches!(
            builder.convert_to_attribute("x".into(), "axes", true),
            Err(GraphError::NotALiteralList { operand: "axes", .. })
        ));
    }

    #[test]
    fn layouts_convert_to_requests() {
        let request = SliceLayout::Inputs {
            data: "x".to_string(),
            starts: "s".to_string(),
            ends: "e".to_string(),
            axes: Some("a".to_string()),
            steps: None,
        }
        .into_request();
        assert_eq!(request.op_type, SLICE_OP_TYPE);
        assert_eq!(request.inputs, vec!["x", "s", "e", "a"]);

        let request = SliceLayout::Attributes {
            data: "x".to_string(),
            starts: vec![0],
            ends: vec![1],
            axes: None,
        }
        .into_request();
        assert_eq!(request.inputs, vec!["x"]);
        assert_eq!(request.attributes.len(), 2);
    }

    #[test]
    fn trimming_stops_on_empty_list() {
        let mut inputs = vec![String::new(), String::new()];
        trim_trailing_placeholders(&mut inputs);
        assert!(inputs.is_empty());
    }

    #[test]
    fn schema_mode_switches_at_opset_ten() {
        assert_eq!(SchemaMode::for_opset(1), SchemaMode::Attribute);
        assert_eq!(SchemaMode::for_opset(9), SchemaMode::Attribute);
        assert_eq!(SchemaMode::for_opset(10), SchemaMode::Input);
        assert_eq!(SchemaMode::for_opset(18), SchemaMode::Input);
    }

    #[test]
    fn slice_args_deserialize_from_json() {
        let args: SliceArgs = serde_json::from_str(
            r#"{"data": "x", "starts": [0, 1], "ends": "e", "axes": null, "keepdims": 1}"#,
        )
        .unwrap();
        assert_eq!(args.data, Operand::Reference("x".to_string()));
        assert_eq!(args.starts, Operand::Literal(vec![0, 1]));
        assert_eq!(args.ends, Operand::Reference("e".to_string()));
        assert_eq!(args.axes, Operand::Absent);
        assert_eq!(args.steps, Operand::Absent);
        assert_eq!(args.extra.keys().collect::<Vec<_>>(), vec!["keepdims"]);
    }

    /// Minimal collaborator recording every call made through the trait.
    #[derive(Default)]
    struct RecordingGraph {
        opset: i64,
        dtypes: HashMap<String, DataType>,
        nodes: Vec<Node>,
        const_calls: usize,
        node_calls: usize,
        next_id: usize,
    }

    impl GraphContext for RecordingGraph {
        fn opset(&self) -> i64 {
            self.opset
        }

        fn make_name(&mut self, prefix: &str) -> String {
            self.next_id += 1;
            format!("{}_{}", prefix, self.next_id)
        }

        fn make_node(
            &mut self,
            request: NodeRequest,
            options: NodeOptions,
        ) -> Result<&Node, GraphError> {
            self.node_calls += 1;
            let name = options.name.unwrap_or_else(|| "node".to_string());
            self.nodes.push(Node {
                outputs: options.outputs.unwrap_or_else(|| vec![format!("{name}_out")]),
                name,
                op_type: request.op_type,
                inputs: request.inputs,
                attributes: request.attributes,
            });
            Ok(self.nodes.last().unwrap())
        }

        fn make_const(&mut self, name: String, value: TensorValue) -> Result<&Node, GraphError> {
            self.const_calls += 1;
            self.dtypes.insert(name.clone(), value.data_type());
            let mut attributes = BTreeMap::new();
            attributes.insert("value".to_string(), Attribute::Tensor(value));
            self.nodes.push(Node {
                name: name.clone(),
                op_type: crate::graph::CONST_OP_TYPE.to_string(),
                inputs: vec![],
                outputs: vec![name],
                attributes,
            });
            Ok(self.nodes.last().unwrap())
        }

        fn get_dtype(&self, value: &str) -> Option<DataType> {
            self.dtypes.get(value).copied()
        }

        fn get_node_by_output(&self, output: &str) -> Option<&Node> {
            self.nodes
                .iter()
                .find(|node| node.outputs.iter().any(|o| o == output))
        }
    }

    #[test]
    fn works_against_any_graph_context() {
        let mut graph = RecordingGraph {
            opset: 11,
            ..Default::default()
        };
        graph.dtypes.insert("x".to_string(), DataType::Float32);

        let output = GraphBuilder::new(&mut graph)
            .make_slice(
                SliceArgs::new("x", vec![0], vec![1]).with_steps(vec![1]),
                NodeOptions::default(),
            )
            .unwrap();

        assert_eq!(output, "node_out");
        assert_eq!(graph.const_calls, 3);
        assert_eq!(graph.node_calls, 1);
        let slice = graph.nodes.last().unwrap();
        assert_eq!(
            slice.inputs,
            vec!["x", "const_slice_1", "const_slice_2", "", "const_slice_3"]
        );
    }
}
