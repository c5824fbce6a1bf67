//! Metric snapshots reported by nodes and by the network as a whole.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUtilization {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub utilization_percent: f64,
    /// Finalized transfers held by the node.
    pub files_stored: usize,
    /// In-flight transfers.
    pub active_transfers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkUtilization {
    pub current_utilization_bps: f64,
    pub max_bandwidth_bps: u64,
    pub utilization_percent: f64,
    /// Neighbor ids in the order links were added.
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_requests_processed: u64,
    pub total_data_transferred_bytes: u64,
    /// Hop attempts rejected for lack of bandwidth.
    pub failed_transfers: u64,
    pub current_active_transfers: usize,
}

/// Everything a node reports about itself in one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node_id: String,
    pub address: Ipv4Addr,
    pub cpu_capacity: u32,
    pub memory_capacity: u32,
    pub storage: StorageUtilization,
    pub network: NetworkUtilization,
    pub performance: PerformanceMetrics,
}

/// Network-wide aggregates. Totals are plain sums over registered nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub total_bandwidth_bps: u64,
    pub used_bandwidth_bps: f64,
    pub bandwidth_utilization: f64,
    pub total_storage_bytes: u64,
    pub used_storage_bytes: u64,
    pub storage_utilization: f64,
    pub active_transfers: usize,
}

/// One entry of the network registry, as seen by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransfer {
    pub source: String,
    pub target: String,
    pub transfer_id: String,
    pub name: String,
    pub total_size: u64,
    /// Chunks completed at the destination.
    pub completed_chunks: usize,
    pub total_chunks: usize,
}

/// `part / whole` as a percentage; 0 when `whole` is not positive.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
