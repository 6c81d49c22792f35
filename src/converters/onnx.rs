use log::debug;
use prost::Message;

use crate::converters::{ConvertedGraph, GraphConverter};
use crate::error::GraphError;
use crate::graph::{
    Attribute, DataType, GraphContext, Node, OnnxGraph, TensorData, TensorValue, ValueInfo,
};
use crate::protos::onnx::{
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    TensorShapeProto, TypeProto, ValueInfoProto, attribute_proto::AttributeType,
    tensor_proto::DataType as ProtoDataType, tensor_shape_proto, type_proto,
};

#[derive(Default)]
pub struct OnnxConverter;

impl OnnxConverter {
    fn data_type_code(data_type: DataType) -> ProtoDataType {
        match data_type {
            DataType::Float16 => ProtoDataType::Float16,
            DataType::Float32 => ProtoDataType::Float,
            DataType::Int8 => ProtoDataType::Int8,
            DataType::Uint8 => ProtoDataType::Uint8,
            DataType::Int32 => ProtoDataType::Int32,
            DataType::Uint32 => ProtoDataType::Uint32,
            DataType::Int64 => ProtoDataType::Int64,
            DataType::Uint64 => ProtoDataType::Uint64,
        }
    }

    fn tensor_proto(name: &str, tensor: &TensorValue) -> TensorProto {
        let mut proto = TensorProto {
            name: name.to_string(),
            dims: tensor.dims.clone(),
            data_type: Self::data_type_code(tensor.data_type()) as i32,
            ..Default::default()
        };
        match &tensor.data {
            TensorData::Int64(values) => proto.int64_data = values.clone(),
            TensorData::Int32(values) => proto.int32_data = values.clone(),
            TensorData::Float32(values) => proto.float_data = values.clone(),
        }
        proto
    }

    fn attribute_proto(name: &str, attribute: &Attribute) -> AttributeProto {
        let mut proto = AttributeProto {
            name: name.to_string(),
            ..Default::default()
        };
        let kind = match attribute {
            Attribute::Int(value) => {
                proto.i = *value;
                AttributeType::Int
            }
            Attribute::Ints(values) => {
                proto.ints = values.clone();
                AttributeType::Ints
            }
            Attribute::Float(value) => {
                proto.f = *value;
                AttributeType::Float
            }
            Attribute::String(value) => {
                proto.s = value.as_bytes().to_vec();
                AttributeType::String
            }
            Attribute::Tensor(tensor) => {
                proto.t = Some(Self::tensor_proto("", tensor));
                AttributeType::Tensor
            }
        };
        proto.r#type = kind as i32;
        proto
    }

    fn node_proto(node: &Node) -> NodeProto {
        NodeProto {
            input: node.inputs.clone(),
            output: node.outputs.clone(),
            name: node.name.clone(),
            op_type: node.op_type.clone(),
            attribute: node
                .attributes
                .iter()
                .map(|(name, attribute)| Self::attribute_proto(name, attribute))
                .collect(),
            ..Default::default()
        }
    }

    fn initializer(node: &Node) -> Result<TensorProto, GraphError> {
        let unsupported = || GraphError::UnsupportedConstantType {
            name: node.name.clone(),
        };
        let Some(Attribute::Tensor(tensor)) = node.attributes.get("value") else {
            return Err(unsupported());
        };
        let output = node.outputs.first().ok_or_else(unsupported)?;
        Ok(Self::tensor_proto(output, tensor))
    }

    pub fn to_model(graph: &OnnxGraph) -> Result<ModelProto, GraphError> {
        let options = graph.options();
        debug!(
            "exporting {} nodes at opset {} (ir version {})",
            graph.nodes().len(),
            options.opset,
            options.ir_version()
        );

        let mut nodes = Vec::new();
        let mut initializers = Vec::new();
        for node in graph.nodes() {
            if node.is_const() {
                initializers.push(Self::initializer(node)?);
            } else {
                nodes.push(Self::node_proto(node));
            }
        }

        let described = |name: &String| {
            graph
                .value_info(name)
                .map(|info| value_info(name, info))
                .ok_or_else(|| GraphError::UnknownValue { name: name.clone() })
        };
        let inputs = graph
            .inputs()
            .iter()
            .map(described)
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = graph
            .outputs()
            .iter()
            .map(described)
            .collect::<Result<Vec<_>, _>>()?;

        // Intermediate values with a known type; initializers already carry theirs.
        let value_infos = graph
            .values()
            .filter(|(name, info)| {
                info.data_type.is_some()
                    && !graph.inputs().contains(*name)
                    && !graph.outputs().contains(*name)
                    && !graph
                        .get_node_by_output(name)
                        .is_some_and(|node| node.is_const())
            })
            .map(|(name, info)| value_info(name, info))
            .collect();

        let graph_proto = GraphProto {
            name: options.graph_name.clone(),
            node: nodes,
            input: inputs,
            output: outputs,
            initializer: initializers,
            value_info: value_infos,
            ..Default::default()
        };

        Ok(ModelProto {
            ir_version: options.ir_version(),
            model_version: 1,
            producer_name: options.producer_name.clone(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            graph: Some(graph_proto),
            opset_import: vec![OperatorSetIdProto {
                version: options.opset,
                domain: "".to_string(), // Empty string = default ONNX domain
            }],
            ..Default::default()
        })
    }
}

impl GraphConverter for OnnxConverter {
    fn format(&self) -> &'static str {
        "onnx"
    }

    fn convert(&self, graph: &OnnxGraph) -> Result<ConvertedGraph, GraphError> {
        let model = Self::to_model(graph)?;
        Ok(ConvertedGraph {
            format: "onnx",
            content_type: "application/onnx",
            data: model.encode_to_vec(),
        })
    }
}

fn value_info(name: &str, info: &ValueInfo) -> ValueInfoProto {
    let elem_type = info
        .data_type
        .map(|dtype| OnnxConverter::data_type_code(dtype) as i32)
        .unwrap_or(ProtoDataType::Undefined as i32);
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type,
                shape: info.shape.as_ref().map(|shape| TensorShapeProto {
                    dim: shape
                        .iter()
                        .map(|d| tensor_shape_proto::Dimension {
                            value: Some(tensor_shape_proto::dimension::Value::DimValue(*d)),
                            denotation: String::new(),
                        })
                        .collect(),
                }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}
