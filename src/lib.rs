pub mod builder;
pub mod converters;
pub mod error;
pub mod graph;
pub mod graphviz;
pub mod loader;
pub mod protos;

pub use builder::{GraphBuilder, Operand, SchemaMode, SliceArgs, SliceLayout};
pub use converters::{ConvertedGraph, ConverterRegistry, GraphConverter};
pub use error::GraphError;
pub use graph::{
    Attribute, DataType, GraphContext, GraphOptions, Node, NodeOptions, NodeRequest, OnnxGraph,
    TensorData, TensorValue,
};
pub use graphviz::graph_to_dot;
pub use loader::{GraphDescription, build_graph, load_description_from_path};
