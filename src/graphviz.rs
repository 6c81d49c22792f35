use std::fmt::Write;

use crate::graph::{Attribute, OnnxGraph};

pub fn graph_to_dot(graph: &OnnxGraph) -> String {
    let mut dot = String::from("digraph onnx {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [fontname=\"Helvetica\"];\n");
    dot.push_str("  edge [fontname=\"Helvetica\"];\n\n");

    for name in graph.inputs() {
        let mut label_lines = vec![format!("Input {}", name)];
        if let Some(info) = graph.value_info(name) {
            if let Some(data_type) = info.data_type {
                label_lines.push(format!("{:?}", data_type));
            }
            label_lines.push(format_shape(info.shape.as_deref()));
        }
        let _ = writeln!(
            dot,
            "  \"{}\" [shape=oval,style=filled,fillcolor=\"#d0e6ff\",label=\"{}\"];",
            escape_label(name),
            escape_label(&label_lines.join("\n"))
        );
    }

    dot.push('\n');

    for (idx, node) in graph.nodes().iter().enumerate() {
        let node_id = format!("node_{}", idx);
        let mut label_lines = vec![format!("{} (#{})", node.op_type, idx), node.name.clone()];
        for (key, attribute) in &node.attributes {
            if let Attribute::Ints(values) = attribute {
                label_lines.push(format!("{} = {:?}", key, values));
            } else if let Attribute::Tensor(tensor) = attribute {
                if let Some(values) = tensor.as_ints() {
                    label_lines.push(format!("{:?}", values));
                }
            }
        }
        let shape = if node.is_const() {
            "shape=diamond,style=filled,fillcolor=\"#f0f0f0\""
        } else {
            "shape=box,style=rounded"
        };
        let _ = writeln!(
            dot,
            "  {} [{},label=\"{}\"];",
            node_id,
            shape,
            escape_label(&label_lines.join("\n"))
        );

        for (input_idx, input) in node.inputs.iter().enumerate() {
            if input.is_empty() {
                continue;
            }
            let _ = writeln!(
                dot,
                "  \"{}\" -> {} [label=\"in{}\"];",
                escape_label(input),
                node_id,
                input_idx
            );
        }
        for output in &node.outputs {
            let _ = writeln!(
                dot,
                "  {} -> \"{}\" [label=\"out\"];",
                node_id,
                escape_label(output)
            );
        }
    }

    if !graph.outputs().is_empty() {
        dot.push('\n');
    }
    for name in graph.outputs() {
        let _ = writeln!(
            dot,
            "  \"{}\" [shape=doublecircle,style=filled,fillcolor=\"#d6f5d6\"];",
            escape_label(name)
        );
    }

    dot.push_str("}\n");
    dot
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_shape(shape: Option<&[i64]>) -> String {
    match shape {
        None => "unknown shape".to_string(),
        Some([]) => "scalar".to_string(),
        Some(dims) => dims
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("x"),
    }
}
