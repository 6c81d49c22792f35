use std::path::PathBuf;

use crate::graph::DataType;
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph description {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("graph description JSON could not be parsed: {source}")]
    Parse {
        #[from]
        source: JsonError,
    },
    #[error("opset {opset} is not supported")]
    UnsupportedOpset { opset: i64 },
    #[error("`{operand}` is required")]
    MissingOperand { operand: &'static str },
    #[error("`{operand}` must be a literal list, but `{value}` is not produced by an integer constant")]
    NotALiteralList {
        operand: &'static str,
        value: String,
    },
    #[error("`{operand}` must reference a graph value, got a literal list")]
    NotAReference { operand: &'static str },
    #[error(
        "input `{value}` of `{op_type}` has data type {found:?} but {expected:?} was expected"
    )]
    DataTypeMismatch {
        op_type: String,
        value: String,
        expected: Option<DataType>,
        found: Option<DataType>,
    },
    #[error("value `{name}` is not produced by any node or graph input")]
    UnknownValue { name: String },
    #[error("node `{name}` has no outputs")]
    NodeWithoutOutputs { name: String },
    #[error("value `{name}` is already produced in the graph")]
    DuplicateOutput { name: String },
    #[error("node name `{name}` is already used in the graph")]
    DuplicateNodeName { name: String },
    #[error("constant `{name}` holds a tensor that cannot be exported")]
    UnsupportedConstantType { name: String },
    #[error("graph converter `{requested}` is not available. Supported: {available:?}")]
    UnknownConverter {
        requested: String,
        available: Vec<&'static str>,
    },
    #[error("graph conversion failed for {format}: {reason}")]
    ConversionFailed { format: String, reason: String },
    #[error("graph could not be exported to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::ExportIo {
            path: path.into(),
            source,
        }
    }
}
