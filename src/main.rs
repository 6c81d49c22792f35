use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use onnx_graph_builder::{
    ConverterRegistry, GraphError, build_graph, graph_to_dot, load_description_from_path,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build opset-aware ONNX slice graphs", long_about = None)]
struct Cli {
    /// Path to a JSON graph description (inputs, constants, slices, outputs).
    description: PathBuf,
    /// Override the opset declared in the description.
    #[arg(long)]
    opset: Option<i64>,
    /// Optional path to write a Graphviz DOT export of the graph.
    #[arg(long)]
    export_dot: Option<PathBuf>,
    /// Convert the graph to a different format (`onnx` or `json`).
    #[arg(long)]
    convert: Option<String>,
    /// Path to write the converted graph (stdout if omitted).
    #[arg(long)]
    convert_output: Option<PathBuf>,
}

fn run() -> Result<(), GraphError> {
    let cli = Cli::parse();
    let description = load_description_from_path(&cli.description)?;
    let graph = build_graph(description, cli.opset)?;

    // Keep stdout clean when it carries converted bytes.
    let summary_to_stdout = cli.convert.is_none() || cli.convert_output.is_some();
    if summary_to_stdout {
        println!(
            "Built graph from `{}` at opset {} with {} nodes.",
            cli.description.display(),
            graph.options().opset,
            graph.nodes().len()
        );
        for node in graph.nodes() {
            println!(
                "  - {} ({}): inputs {:?} -> outputs {:?}",
                node.name, node.op_type, node.inputs, node.outputs
            );
        }
    }

    if let Some(dot_path) = cli.export_dot {
        let dot = graph_to_dot(&graph);
        std::fs::write(&dot_path, dot).map_err(|err| GraphError::export(dot_path.clone(), err))?;
        if summary_to_stdout {
            println!("Exported Graphviz DOT to `{}`.", dot_path.display());
        }
    }

    if let Some(format) = cli.convert {
        let converted = ConverterRegistry::with_defaults().convert(&format, &graph)?;
        if let Some(path) = cli.convert_output {
            std::fs::write(&path, converted.data)
                .map_err(|err| GraphError::export(path.clone(), err))?;
            println!(
                "Converted graph to `{}` format at `{}` (type {}).",
                converted.format,
                path.display(),
                converted.content_type
            );
        } else {
            std::io::stdout()
                .write_all(&converted.data)
                .map_err(|err| GraphError::ConversionFailed {
                    format: converted.format.to_string(),
                    reason: err.to_string(),
                })?;
        }
    }
    Ok(())
}

fn main() {
    let _ = env_logger::Builder::from_env("ONNX_GRAPH_BUILDER_LOG").try_init();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
