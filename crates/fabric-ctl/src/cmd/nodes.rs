//! Per-node commands: listing, detail, stored files.

use std::fmt::Write;

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeInfo {
    node_id: String,
    address: String,
    cpu_capacity: u32,
    memory_capacity: u32,
    storage: StorageInfo,
    network: NetworkInfo,
    performance: PerformanceInfo,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct StorageInfo {
    used_bytes: u64,
    total_bytes: u64,
    utilization_percent: f64,
    files_stored: usize,
    active_transfers: usize,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct NetworkInfo {
    current_utilization_bps: f64,
    max_bandwidth_bps: u64,
    utilization_percent: f64,
    connections: Vec<String>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct PerformanceInfo {
    total_requests_processed: u64,
    total_data_transferred_bytes: u64,
    failed_transfers: u64,
    current_active_transfers: usize,
}

#[derive(Deserialize)]
struct StoredFile {
    transfer_id: String,
    name: String,
    size: u64,
    chunks: usize,
    completed_at: Option<u64>,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_nodes(port: u16) -> Result<()> {
    let resp: Vec<NodeInfo> = get_json(&format!("{}/nodes", base_url(port))).await?;

    if resp.is_empty() {
        println!("No nodes registered.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Nodes ({})", resp.len());
    println!("═══════════════════════════════════════");

    for n in &resp {
        println!("  ┌─ {} ({})", n.node_id, n.address);
        println!(
            "  │  storage   : {} / {} ({:.2}%)",
            human_bytes(n.storage.used_bytes),
            human_bytes(n.storage.total_bytes),
            n.storage.utilization_percent
        );
        println!("  │  links     : {}", n.network.connections.join(", "));
        println!(
            "  └─ transfers : {} in flight, {} stored",
            n.storage.active_transfers, n.storage.files_stored
        );
    }

    Ok(())
}

pub async fn cmd_node(port: u16, node_id: &str) -> Result<()> {
    let n: NodeInfo = get_json(&format!("{}/nodes/{}", base_url(port), node_id)).await?;
    print!("{}", node_detail(&n));
    Ok(())
}

fn node_detail(n: &NodeInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "═══════════════════════════════════════");
    let _ = writeln!(out, "  Node {}", n.node_id);
    let _ = writeln!(out, "═══════════════════════════════════════");
    let _ = writeln!(out, "  Address          : {}", n.address);
    let _ = writeln!(
        out,
        "  CPU / memory     : {} cores / {} GB",
        n.cpu_capacity, n.memory_capacity
    );
    let _ = writeln!(
        out,
        "  Storage          : {} / {} ({:.2}%)",
        human_bytes(n.storage.used_bytes),
        human_bytes(n.storage.total_bytes),
        n.storage.utilization_percent
    );
    let _ = writeln!(
        out,
        "  Bandwidth        : {:.0} / {} bps ({:.2}%)",
        n.network.current_utilization_bps,
        n.network.max_bandwidth_bps,
        n.network.utilization_percent
    );
    let _ = writeln!(out, "  Links            : {}", n.network.connections.join(", "));
    let _ = writeln!(
        out,
        "  Files finalized  : {}",
        n.performance.total_requests_processed
    );
    let _ = writeln!(
        out,
        "  Data relayed     : {}",
        human_bytes(n.performance.total_data_transferred_bytes)
    );
    let _ = writeln!(out, "  Failed hops      : {}", n.performance.failed_transfers);
    let _ = writeln!(
        out,
        "  In flight        : {}",
        n.performance.current_active_transfers
    );
    out
}

pub async fn cmd_files(port: u16, node_id: &str) -> Result<()> {
    let resp: Vec<StoredFile> =
        get_json(&format!("{}/nodes/{}/files", base_url(port), node_id)).await?;

    if resp.is_empty() {
        println!("No files stored on {}.", node_id);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Files on {} ({})", node_id, resp.len());
    println!("═══════════════════════════════════════");

    for f in &resp {
        println!("  ┌─ {}", f.name);
        println!("  │  id        : {}", f.transfer_id);
        println!("  │  size      : {} in {} chunks", human_bytes(f.size), f.chunks);
        match f.completed_at {
            Some(ms) => println!("  └─ completed : {} (unix ms)", ms),
            None => println!("  └─ completed : unknown"),
        }
    }

    Ok(())
}

pub(crate) fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
