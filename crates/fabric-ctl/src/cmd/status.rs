//! Network-wide stats and in-flight transfer commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};
use super::nodes::human_bytes;

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatsResponse {
    total_nodes: usize,
    total_bandwidth_bps: u64,
    used_bandwidth_bps: f64,
    bandwidth_utilization: f64,
    total_storage_bytes: u64,
    used_storage_bytes: u64,
    storage_utilization: f64,
    active_transfers: usize,
}

#[derive(Deserialize)]
struct TransferInfo {
    source: String,
    target: String,
    transfer_id: String,
    name: String,
    total_size: u64,
    completed_chunks: usize,
    total_chunks: usize,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatsResponse = get_json(&format!("{}/stats", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Fabric Network Status");
    println!("═══════════════════════════════════════");
    println!("  Nodes            : {}", resp.total_nodes);
    println!(
        "  Storage          : {} / {} ({:.2}%)",
        human_bytes(resp.used_storage_bytes),
        human_bytes(resp.total_storage_bytes),
        resp.storage_utilization
    );
    println!(
        "  Bandwidth        : {:.0} / {} bps ({:.2}%)",
        resp.used_bandwidth_bps, resp.total_bandwidth_bps, resp.bandwidth_utilization
    );
    println!("  Active transfers : {}", resp.active_transfers);

    Ok(())
}

pub async fn cmd_transfers(port: u16) -> Result<()> {
    let resp: Vec<TransferInfo> = get_json(&format!("{}/transfers", base_url(port))).await?;

    if resp.is_empty() {
        println!("No transfers in flight.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Transfers In Flight ({})", resp.len());
    println!("═══════════════════════════════════════");

    for t in &resp {
        println!("  ┌─ {}", t.transfer_id);
        println!("  │  file     : {} ({})", t.name, human_bytes(t.total_size));
        println!("  │  route    : {} → {}", t.source, t.target);
        println!("  └─ progress : {}/{} chunks", t.completed_chunks, t.total_chunks);
    }

    Ok(())
}
