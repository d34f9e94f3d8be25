//! `mindweave-relay`: hosts collaboration rooms over WebSocket.
//!
//! ```text
//! mindweave-relay --graph plans/roadmap.xml --graph notes.xml --default-permission view
//! ```
//!
//! Each `--graph` file becomes a room; ids are assigned 1..n in argument
//! order and the share code is the file stem. Without `--graph` a sample
//! graph is served as room 1, share code `sample`.

mod relay;

use anyhow::{Context, Result};
use axum::{Json, Router, routing::get};
use clap::Parser;
use mm_collab::{Hub, MemoryStore, Permission, StoredGraph};
use mm_core::GraphData;
use relay::Relay;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Mind-map XML file to serve; repeatable.
    #[arg(long = "graph")]
    graphs: Vec<PathBuf>,

    /// Access for users without an explicit grant: owner, edit, or view.
    #[arg(long, default_value = "edit")]
    default_permission: Permission,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let store = seed_store(&args.graphs, args.default_permission)?;
    log::info!("serving {} graph(s)", store.len());
    let relay = Relay::spawn(Hub::new(store));

    let app = Router::new()
        .route("/ws", get(relay::ws_handler))
        .route("/health", get(health))
        .with_state(relay);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    log::info!("relay listening on {}", args.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn seed_store(paths: &[PathBuf], default_permission: Permission) -> Result<MemoryStore> {
    let mut store = MemoryStore::new();
    if paths.is_empty() {
        let graph = StoredGraph::new("sample", GraphData::sample())
            .shared_as("sample")
            .open_to_all(default_permission);
        store.insert(1, graph);
        return Ok(store);
    }
    for (index, path) in paths.iter().enumerate() {
        let data = load_graph(path)?;
        let code = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("graph")
            .to_string();
        let id = index as u64 + 1;
        log::info!("graph {id} ({code}): {} nodes", data.nodes.len());
        let graph = StoredGraph::new(code.clone(), data)
            .shared_as(code)
            .open_to_all(default_permission);
        store.insert(id, graph);
    }
    Ok(store)
}

fn load_graph(path: &Path) -> Result<GraphData> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    mm_core::xml::from_xml(&xml).with_context(|| format!("failed to parse {}", path.display()))
}
