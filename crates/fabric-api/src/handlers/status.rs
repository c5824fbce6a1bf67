//! /stats and /transfers handlers.

use axum::extract::State;
use axum::Json;

use fabric_services::{ActiveTransfer, NetworkStats};

use super::ApiState;

// ── /stats ───────────────────────────────────────────────────────────────────

pub async fn handle_stats(State(state): State<ApiState>) -> Json<NetworkStats> {
    Json(state.network.stats().await)
}

// ── /transfers ───────────────────────────────────────────────────────────────

pub async fn handle_transfers(State(state): State<ApiState>) -> Json<Vec<ActiveTransfer>> {
    Json(state.network.active_transfers().await)
}
