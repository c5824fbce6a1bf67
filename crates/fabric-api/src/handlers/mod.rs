//! HTTP API handlers. Exposes network state as JSON.

pub mod nodes;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;

use fabric_services::{Network, StorageNode};

pub use nodes::{handle_node, handle_node_files, handle_nodes};
pub use status::{handle_stats, handle_transfers};

#[derive(Clone)]
pub struct ApiState {
    pub network: Arc<Network>,
}

impl ApiState {
    pub fn new(network: Arc<Network>) -> Self {
        Self { network }
    }
}

pub(crate) fn lookup_node(
    state: &ApiState,
    node_id: &str,
) -> Result<Arc<StorageNode>, (StatusCode, String)> {
    state
        .network
        .node(node_id)
        .ok_or((StatusCode::NOT_FOUND, format!("unknown node {node_id}")))
}
