//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `storyvault_core` linkage.
//! - Optionally summarize a data directory: `storyvault_cli [DATA_DIR|--default]`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storyvault_core::{
    default_data_dir, FileStore, GraphRepository, NoteRepository, ProjectRepository, StoreResult,
};

fn main() -> ExitCode {
    println!("storyvault_core ping={}", storyvault_core::ping());
    println!("storyvault_core version={}", storyvault_core::core_version());

    let Some(arg) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let dir = if arg == "--default" {
        default_data_dir()
    } else {
        PathBuf::from(arg)
    };

    match summarize(&dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("summary failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(dir: &Path) -> StoreResult<()> {
    let store = FileStore::open(dir)?;
    println!("data_dir={}", store.base_dir().display());
    match store.read_project() {
        Ok(Some(project)) => println!("project={}", project.name),
        Ok(None) => println!("project=<none>"),
        Err(err) => println!("project=<unreadable: {}>", err.kind()),
    }
    println!("notes={}", store.list_notes()?.len());
    let graph = store.read_graph()?;
    println!(
        "graph_nodes={} graph_edges={}",
        graph.nodes.len(),
        graph.edges.len()
    );
    Ok(())
}
