//! signalgraph-inspect - load signal-graph documents and print their tree
//!
//! Usage: `signalgraph-inspect [--config <path>] <document.json>...`

use anyhow::Context;
use clap::Parser;
use signalgraph_rs::{model::NodeRole, Editor, EditorConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "signalgraph-inspect")]
#[command(about = "Load signal-graph documents and print their tree", long_about = None)]
struct Args {
    /// Config file (defaults to the per-user config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Library and signal-graph documents, opened in order
    #[arg(required = true)]
    documents: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config.or_else(EditorConfig::default_path) {
        Some(path) => EditorConfig::load_or_default(path),
        None => EditorConfig::default(),
    };

    // Keep the guard alive so the file writer flushes on exit
    let _guard = signalgraph_rs::logging::init(&config.logging)?;

    tracing::info!("Starting signalgraph-inspect");

    let mut editor = Editor::new(&config);
    for path in &args.documents {
        let cursor = editor
            .open_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tracing::info!("Opened {} at {}", path.display(), cursor);
    }

    let model = editor.model();
    for (cursor, object, permissions) in editor.tree().snapshot() {
        let indent = "  ".repeat(cursor.depth().saturating_sub(1));
        println!(
            "{:<16} {} {}{}",
            cursor.to_string(),
            permissions,
            indent,
            model.describe(&object)
        );
    }

    println!();
    for (_, signal_graph) in model.signal_graphs() {
        let Some(graph) = model.graph(signal_graph.graph) else {
            continue;
        };
        let connections: usize = graph
            .nodes()
            .iter()
            .filter_map(|&n| model.node(n))
            .flat_map(|n| n.out_ports().iter())
            .filter_map(|&p| model.port(p))
            .map(|p| p.links().len())
            .sum();
        println!(
            "{}: {} nodes ({} input, {} output, {} processing), {} connections",
            signal_graph.filename,
            graph.nodes().len(),
            graph.nodes_with_role(NodeRole::Input).len(),
            graph.nodes_with_role(NodeRole::Output).len(),
            graph.nodes_with_role(NodeRole::Processing).len(),
            connections
        );
    }

    Ok(())
}
