//! Fabric integration test harness.
//!
//! Everything runs in-process against a `Network` built here. Tests that
//! relay chunks use a paused clock so simulated hop delays advance
//! virtually.
//!
//!   cargo test --test integration

use std::net::Ipv4Addr;

use fabric_core::config::MonitorConfig;
use fabric_services::{Network, NodeProfile, StorageNode};

mod chunking;
mod lifecycle;
mod rollback;
mod stats;
mod transfers;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const GIB: u64 = 1024 * 1024 * 1024;
pub const GBIT: u64 = 1_000_000_000;

/// A node with the given storage (bytes) and bandwidth (bits/sec).
pub fn node(id: &str, total_storage: u64, bandwidth: u64) -> StorageNode {
    StorageNode::new(
        NodeProfile {
            id: id.to_string(),
            address: Ipv4Addr::LOCALHOST,
            cpu_capacity: 4,
            memory_capacity: 16,
            total_storage,
            bandwidth,
        },
        quick_monitors(),
    )
}

pub fn quick_monitors() -> MonitorConfig {
    MonitorConfig {
        listen_interval_ms: 20,
        storage_report_interval_ms: 50,
        transfer_report_interval_ms: 30,
        stop_timeout_ms: 100,
    }
}

/// Nodes `ids[0] - ids[1] - ...` linked in a line, each with `storage` bytes.
pub async fn line(ids: &[&str], storage: u64) -> Network {
    let network = Network::new();
    for id in ids {
        network.add_node(node(id, storage, GBIT));
    }
    for pair in ids.windows(2) {
        assert!(network.connect_nodes(pair[0], pair[1], GBIT).await);
    }
    network
}
