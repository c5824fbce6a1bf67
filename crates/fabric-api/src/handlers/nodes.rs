//! /nodes, /nodes/{id}, /nodes/{id}/files handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use futures::future::join_all;
use serde::Serialize;

use fabric_services::NodeSnapshot;

use super::{lookup_node, ApiState};

// ── /nodes ───────────────────────────────────────────────────────────────────

pub async fn handle_nodes(State(state): State<ApiState>) -> Json<Vec<NodeSnapshot>> {
    let nodes = state.network.topology().nodes();
    Json(join_all(nodes.iter().map(|n| n.snapshot())).await)
}

// ── /nodes/{id} ──────────────────────────────────────────────────────────────

pub async fn handle_node(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeSnapshot>, (StatusCode, String)> {
    let node = lookup_node(&state, &node_id)?;
    Ok(Json(node.snapshot().await))
}

// ── /nodes/{id}/files ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub transfer_id: String,
    pub name: String,
    pub size: u64,
    pub chunks: usize,
    pub completed_at: Option<u64>,
}

pub async fn handle_node_files(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<StoredFile>>, (StatusCode, String)> {
    let node = lookup_node(&state, &node_id)?;
    let files = node
        .stored_files()
        .await
        .into_iter()
        .map(|t| StoredFile {
            chunks: t.chunks.len(),
            transfer_id: t.id,
            name: t.name,
            size: t.total_size,
            completed_at: t.completed_at,
        })
        .collect();
    Ok(Json(files))
}
