use crate::converters::{ConvertedGraph, GraphConverter};
use crate::error::GraphError;
use crate::graph::OnnxGraph;

/// Human-readable dump of the graph, mostly useful for debugging builders.
#[derive(Default)]
pub struct JsonConverter;

impl GraphConverter for JsonConverter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn convert(&self, graph: &OnnxGraph) -> Result<ConvertedGraph, GraphError> {
        let mut data =
            serde_json::to_vec_pretty(graph).map_err(|err| GraphError::ConversionFailed {
                format: "json".to_string(),
                reason: err.to_string(),
            })?;
        data.push(b'\n');
        Ok(ConvertedGraph {
            format: "json",
            content_type: "application/json",
            data,
        })
    }
}
