use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

pub const DEFAULT_OPSET: i64 = 13;
pub const CONST_OP_TYPE: &str = "Const";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float16,
    Float32,
    Int8,
    Uint8,
    Int32,
    Uint32,
    Int64,
    Uint64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorData {
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

/// Literal tensor held by a constant node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorValue {
    pub dims: Vec<i64>,
    pub data: TensorData,
}

impl TensorValue {
    /// One-dimensional INT64 tensor, the layout used for slice bounds.
    pub fn from_ints(values: Vec<i64>) -> Self {
        Self {
            dims: vec![values.len() as i64],
            data: TensorData::Int64(values),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self.data {
            TensorData::Int64(_) => DataType::Int64,
            TensorData::Int32(_) => DataType::Int32,
            TensorData::Float32(_) => DataType::Float32,
        }
    }

    pub fn as_ints(&self) -> Option<Vec<i64>> {
        match &self.data {
            TensorData::Int64(values) => Some(values.clone()),
            TensorData::Int32(values) => Some(values.iter().map(|v| *v as i64).collect()),
            TensorData::Float32(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    String(String),
    Tensor(TensorValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Node {
    pub fn is_const(&self) -> bool {
        self.op_type == CONST_OP_TYPE
    }

    /// Literal contents of a constant node, read back as a list of integers.
    ///
    /// Returns `None` for non-constant nodes and for constants holding
    /// floating point data.
    pub fn get_tensor_value_as_list(&self) -> Option<Vec<i64>> {
        if !self.is_const() {
            return None;
        }
        match self.attributes.get("value") {
            Some(Attribute::Tensor(tensor)) => tensor.as_ints(),
            _ => None,
        }
    }
}

/// Operation type, ordered inputs and attributes of a node about to be
/// created. An empty input string is an unconnected optional slot.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRequest {
    pub op_type: String,
    pub inputs: Vec<String>,
    pub attributes: BTreeMap<String, Attribute>,
}

/// Naming and typing hints forwarded to node creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOptions {
    pub name: Option<String>,
    pub outputs: Option<Vec<String>>,
    pub shapes: Option<Vec<Vec<i64>>>,
    pub dtypes: Option<Vec<DataType>>,
}

/// Capabilities node-construction helpers need from the graph they extend.
pub trait GraphContext {
    fn opset(&self) -> i64;

    /// Fresh name derived from `prefix`, unique within this graph.
    fn make_name(&mut self, prefix: &str) -> String;

    fn make_node(
        &mut self,
        request: NodeRequest,
        options: NodeOptions,
    ) -> Result<&Node, GraphError>;

    fn make_const(&mut self, name: String, value: TensorValue) -> Result<&Node, GraphError>;

    fn get_dtype(&self, value: &str) -> Option<DataType>;

    fn get_node_by_output(&self, output: &str) -> Option<&Node>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub opset: i64,
    pub ir_version: Option<i64>,
    pub producer_name: String,
    pub graph_name: String,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            opset: DEFAULT_OPSET,
            ir_version: None,
            producer_name: env!("CARGO_PKG_NAME").to_string(),
            graph_name: "slice_graph".to_string(),
        }
    }
}

impl GraphOptions {
    pub fn ir_version(&self) -> i64 {
        self.ir_version
            .unwrap_or_else(|| ir_version_for_opset(self.opset))
    }
}

/// Lowest ONNX IR version able to carry models importing `opset`.
pub fn ir_version_for_opset(opset: i64) -> i64 {
    match opset {
        i64::MIN..=8 => 3,
        9 => 4,
        10 => 5,
        11 => 6,
        12..=14 => 7,
        15..=18 => 8,
        19..=20 => 9,
        _ => 10,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub data_type: Option<DataType>,
    pub shape: Option<Vec<i64>>,
}

/// In-memory ONNX graph: nodes in creation order plus the value table
/// needed to resolve references between them.
#[derive(Debug, Clone, Serialize)]
pub struct OnnxGraph {
    options: GraphOptions,
    inputs: Vec<String>,
    outputs: Vec<String>,
    nodes: Vec<Node>,
    values: BTreeMap<String, ValueInfo>,
    #[serde(skip)]
    producers: HashMap<String, usize>,
    #[serde(skip)]
    node_names: HashSet<String>,
    #[serde(skip)]
    next_name_id: usize,
}

impl OnnxGraph {
    pub fn new(options: GraphOptions) -> Result<Self, GraphError> {
        if options.opset < 1 {
            return Err(GraphError::UnsupportedOpset {
                opset: options.opset,
            });
        }
        Ok(Self {
            options,
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
            values: BTreeMap::new(),
            producers: HashMap::new(),
            node_names: HashSet::new(),
            next_name_id: 0,
        })
    }

    pub fn with_opset(opset: i64) -> Result<Self, GraphError> {
        Self::new(GraphOptions {
            opset,
            ..Default::default()
        })
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn value_info(&self, name: &str) -> Option<&ValueInfo> {
        self.values.get(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&String, &ValueInfo)> {
        self.values.iter()
    }

    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        shape: Option<Vec<i64>>,
    ) -> Result<String, GraphError> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(GraphError::DuplicateOutput { name });
        }
        self.values.insert(
            name.clone(),
            ValueInfo {
                data_type: Some(data_type),
                shape,
            },
        );
        self.inputs.push(name.clone());
        Ok(name)
    }

    pub fn add_output(&mut self, name: impl Into<String>) -> Result<(), GraphError> {
        let name = name.into();
        if !self.values.contains_key(&name) {
            return Err(GraphError::UnknownValue { name });
        }
        if !self.outputs.contains(&name) {
            self.outputs.push(name);
        }
        Ok(())
    }

    fn insert_node(&mut self, node: Node) -> &Node {
        let index = self.nodes.len();
        for output in &node.outputs {
            self.producers.insert(output.clone(), index);
            self.values.entry(output.clone()).or_default();
        }
        self.node_names.insert(node.name.clone());
        self.nodes.push(node);
        &self.nodes[index]
    }

    fn check_fresh_name(&self, name: &str) -> Result<(), GraphError> {
        if self.node_names.contains(name) {
            return Err(GraphError::DuplicateNodeName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn check_fresh_outputs(&self, outputs: &[String]) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for output in outputs {
            if self.values.contains_key(output) || !seen.insert(output.as_str()) {
                return Err(GraphError::DuplicateOutput {
                    name: output.clone(),
                });
            }
        }
        Ok(())
    }
}

impl GraphContext for OnnxGraph {
    fn opset(&self) -> i64 {
        self.options.opset
    }

    fn make_name(&mut self, prefix: &str) -> String {
        loop {
            self.next_name_id += 1;
            let candidate = format!("{}__{}", prefix, self.next_name_id);
            if !self.node_names.contains(&candidate) && !self.values.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn make_node(
        &mut self,
        request: NodeRequest,
        options: NodeOptions,
    ) -> Result<&Node, GraphError> {
        for input in request.inputs.iter().filter(|input| !input.is_empty()) {
            if !self.values.contains_key(input) {
                return Err(GraphError::UnknownValue {
                    name: input.clone(),
                });
            }
        }

        if options.outputs.as_ref().is_some_and(Vec::is_empty) {
            return Err(GraphError::NodeWithoutOutputs {
                name: options.name.unwrap_or(request.op_type),
            });
        }

        let name = match options.name {
            Some(name) => {
                self.check_fresh_name(&name)?;
                name
            }
            None => self.make_name(&request.op_type),
        };
        let outputs = options
            .outputs
            .unwrap_or_else(|| vec![format!("{}:0", name)]);
        self.check_fresh_outputs(&outputs)?;

        debug!(
            "make_node {} ({}) inputs={:?} outputs={:?}",
            name, request.op_type, request.inputs, outputs
        );

        let node = Node {
            name,
            op_type: request.op_type,
            inputs: request.inputs,
            outputs,
            attributes: request.attributes,
        };
        let dtypes = options.dtypes.unwrap_or_default();
        let shapes = options.shapes.unwrap_or_default();
        for (idx, output) in node.outputs.iter().enumerate() {
            self.values.insert(
                output.clone(),
                ValueInfo {
                    data_type: dtypes.get(idx).copied(),
                    shape: shapes.get(idx).cloned(),
                },
            );
        }
        Ok(self.insert_node(node))
    }

    fn make_const(&mut self, name: String, value: TensorValue) -> Result<&Node, GraphError> {
        self.check_fresh_name(&name)?;
        let output = name.clone();
        self.check_fresh_outputs(std::slice::from_ref(&output))?;

        debug!(
            "make_const {} {:?} dims={:?}",
            name,
            value.data_type(),
            value.dims
        );

        self.values.insert(
            output.clone(),
            ValueInfo {
                data_type: Some(value.data_type()),
                shape: Some(value.dims.clone()),
            },
        );
        let mut attributes = BTreeMap::new();
        attributes.insert("value".to_string(), Attribute::Tensor(value));
        Ok(self.insert_node(Node {
            name,
            op_type: CONST_OP_TYPE.to_string(),
            inputs: vec![],
            outputs: vec![output],
            attributes,
        }))
    }

    fn get_dtype(&self, value: &str) -> Option<DataType> {
        self.values.get(value).and_then(|info| info.data_type)
    }

    fn get_node_by_output(&self, output: &str) -> Option<&Node> {
        self.producers.get(output).map(|idx| &self.nodes[*idx])
    }
}
