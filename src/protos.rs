//! Protobuf messages for the part of `onnx.proto3` the exporter writes.
//!
//! Field tags follow the upstream ONNX schema so the encoded bytes are a
//! valid `ModelProto`.

pub mod onnx {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ModelProto {
        #[prost(int64, tag = "1")]
        pub ir_version: i64,
        #[prost(message, repeated, tag = "8")]
        pub opset_import: ::prost::alloc::vec::Vec<OperatorSetIdProto>,
        #[prost(string, tag = "2")]
        pub producer_name: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub producer_version: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub domain: ::prost::alloc::string::String,
        #[prost(int64, tag = "5")]
        pub model_version: i64,
        #[prost(string, tag = "6")]
        pub doc_string: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "7")]
        pub graph: ::core::option::Option<GraphProto>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OperatorSetIdProto {
        /// Empty string is the default ONNX domain.
        #[prost(string, tag = "1")]
        pub domain: ::prost::alloc::string::String,
        #[prost(int64, tag = "2")]
        pub version: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GraphProto {
        #[prost(message, repeated, tag = "1")]
        pub node: ::prost::alloc::vec::Vec<NodeProto>,
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "5")]
        pub initializer: ::prost::alloc::vec::Vec<TensorProto>,
        #[prost(string, tag = "10")]
        pub doc_string: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "11")]
        pub input: ::prost::alloc::vec::Vec<ValueInfoProto>,
        #[prost(message, repeated, tag = "12")]
        pub output: ::prost::alloc::vec::Vec<ValueInfoProto>,
        #[prost(message, repeated, tag = "13")]
        pub value_info: ::prost::alloc::vec::Vec<ValueInfoProto>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeProto {
        /// An empty name marks an unconnected optional input.
        #[prost(string, repeated, tag = "1")]
        pub input: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(string, repeated, tag = "2")]
        pub output: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(string, tag = "3")]
        pub name: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub op_type: ::prost::alloc::string::String,
        #[prost(string, tag = "7")]
        pub domain: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "5")]
        pub attribute: ::prost::alloc::vec::Vec<AttributeProto>,
        #[prost(string, tag = "6")]
        pub doc_string: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AttributeProto {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(enumeration = "attribute_proto::AttributeType", tag = "20")]
        pub r#type: i32,
        #[prost(float, tag = "2")]
        pub f: f32,
        #[prost(int64, tag = "3")]
        pub i: i64,
        #[prost(bytes = "vec", tag = "4")]
        pub s: ::prost::alloc::vec::Vec<u8>,
        #[prost(message, optional, tag = "5")]
        pub t: ::core::option::Option<TensorProto>,
        #[prost(float, repeated, tag = "7")]
        pub floats: ::prost::alloc::vec::Vec<f32>,
        #[prost(int64, repeated, tag = "8")]
        pub ints: ::prost::alloc::vec::Vec<i64>,
        #[prost(bytes = "vec", repeated, tag = "9")]
        pub strings: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    }

    pub mod attribute_proto {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum AttributeType {
            Undefined = 0,
            Float = 1,
            Int = 2,
            String = 3,
            Tensor = 4,
            Graph = 5,
            Floats = 6,
            Ints = 7,
            Strings = 8,
            Tensors = 9,
            Graphs = 10,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TensorProto {
        #[prost(int64, repeated, tag = "1")]
        pub dims: ::prost::alloc::vec::Vec<i64>,
        #[prost(int32, tag = "2")]
        pub data_type: i32,
        #[prost(float, repeated, tag = "4")]
        pub float_data: ::prost::alloc::vec::Vec<f32>,
        #[prost(int32, repeated, tag = "5")]
        pub int32_data: ::prost::alloc::vec::Vec<i32>,
        #[prost(int64, repeated, tag = "7")]
        pub int64_data: ::prost::alloc::vec::Vec<i64>,
        #[prost(string, tag = "8")]
        pub name: ::prost::alloc::string::String,
        #[prost(bytes = "vec", tag = "9")]
        pub raw_data: ::prost::alloc::vec::Vec<u8>,
        #[prost(string, tag = "12")]
        pub doc_string: ::prost::alloc::string::String,
    }

    pub mod tensor_proto {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum DataType {
            Undefined = 0,
            Float = 1,
            Uint8 = 2,
            Int8 = 3,
            Uint16 = 4,
            Int16 = 5,
            Int32 = 6,
            Int64 = 7,
            String = 8,
            Bool = 9,
            Float16 = 10,
            Double = 11,
            Uint32 = 12,
            Uint64 = 13,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ValueInfoProto {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub r#type: ::core::option::Option<TypeProto>,
        #[prost(string, tag = "3")]
        pub doc_string: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TypeProto {
        #[prost(string, tag = "6")]
        pub denotation: ::prost::alloc::string::String,
        #[prost(oneof = "type_proto::Value", tags = "1")]
        pub value: ::core::option::Option<type_proto::Value>,
    }

    pub mod type_proto {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Tensor {
            #[prost(int32, tag = "1")]
            pub elem_type: i32,
            #[prost(message, optional, tag = "2")]
            pub shape: ::core::option::Option<super::TensorShapeProto>,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            #[prost(message, tag = "1")]
            TensorType(Tensor),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TensorShapeProto {
        #[prost(message, repeated, tag = "1")]
        pub dim: ::prost::alloc::vec::Vec<tensor_shape_proto::Dimension>,
    }

    pub mod tensor_shape_proto {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Dimension {
            #[prost(string, tag = "3")]
            pub denotation: ::prost::alloc::string::String,
            #[prost(oneof = "dimension::Value", tags = "1, 2")]
            pub value: ::core::option::Option<dimension::Value>,
        }

        pub mod dimension {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Value {
                #[prost(int64, tag = "1")]
                DimValue(i64),
                #[prost(string, tag = "2")]
                DimParam(::prost::alloc::string::String),
            }
        }
    }
}
