//! Storage node: local capacity, bandwidth, and per-transfer chunk state.
//!
//! All mutable node state lives behind one mutex. Hops are additionally
//! serialized through a separate lane so a node relays one chunk at a time
//! without holding the state lock across the simulated transfer delay.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::Mutex;

use fabric_core::config::{MonitorConfig, NodeConfig};
use fabric_core::{ChunkStatus, Transfer};

use crate::metrics::{
    percent, NetworkUtilization, NodeSnapshot, PerformanceMetrics, StorageUtilization,
};
use crate::monitor::Lifecycle;

/// Share of the granted bandwidth charged to utilization while a hop is in flight.
const HOP_LOAD_FACTOR: f64 = 0.2;

/// Fixed characteristics of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProfile {
    pub id: String,
    pub address: Ipv4Addr,
    /// Informational only.
    pub cpu_capacity: u32,
    /// Informational only.
    pub memory_capacity: u32,
    /// Bytes.
    pub total_storage: u64,
    /// Bits/sec.
    pub bandwidth: u64,
}

impl From<&NodeConfig> for NodeProfile {
    fn from(config: &NodeConfig) -> Self {
        Self {
            id: config.id.clone(),
            address: config.address,
            cpu_capacity: config.cpu_capacity,
            memory_capacity: config.memory_capacity,
            total_storage: config.storage_bytes(),
            bandwidth: config.bandwidth_bps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("insufficient storage on {node}: requested {requested} bytes, {free} free")]
    InsufficientStorage {
        node: String,
        requested: u64,
        free: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HopError {
    #[error("transfer {0} is not in flight here")]
    UnknownTransfer(String),
    #[error("transfer {transfer} has no chunk {index}")]
    UnknownChunk { transfer: String, index: u64 },
    #[error("no bandwidth available on {node} for a hop from {upstream}")]
    BandwidthExhausted { node: String, upstream: String },
}

/// Result of a successful hop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HopReport {
    /// Bandwidth granted to the hop, bits/sec.
    pub bandwidth_bps: f64,
    /// Simulated time the hop took.
    pub transfer_time: Duration,
    /// True if this hop finalized the transfer at this node.
    pub finalized: bool,
}

#[derive(Debug, Default)]
struct NodeState {
    used_storage: u64,
    network_utilization: f64,
    /// neighbor id → link bandwidth (bits/sec), in insertion order.
    connections: IndexMap<String, u64>,
    active: HashMap<String, Transfer>,
    stored: HashMap<String, Transfer>,
    requests_completed: u64,
    bytes_transferred: u64,
    failed_hops: u64,
}

pub struct StorageNode {
    profile: NodeProfile,
    state: Mutex<NodeState>,
    hop_lane: Mutex<()>,
    pub(crate) lifecycle: Mutex<Lifecycle>,
    pub(crate) monitor: MonitorConfig,
}

impl StorageNode {
    pub fn new(profile: NodeProfile, monitor: MonitorConfig) -> Self {
        Self {
            profile,
            state: Mutex::new(NodeState::default()),
            hop_lane: Mutex::new(()),
            lifecycle: Mutex::new(Lifecycle::Unstarted),
            monitor,
        }
    }

    pub fn from_config(config: &NodeConfig, monitor: MonitorConfig) -> Self {
        Self::new(NodeProfile::from(config), monitor)
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn address(&self) -> Ipv4Addr {
        self.profile.address
    }

    pub fn profile(&self) -> &NodeProfile {
        &self.profile
    }

    // ── Links ────────────────────────────────────────────────────────────────

    /// Record a link to `neighbor`. Re-adding a neighbor overwrites its bandwidth.
    pub async fn add_connection(&self, neighbor: &str, bandwidth_bps: u64) {
        self.state
            .lock()
            .await
            .connections
            .insert(neighbor.to_string(), bandwidth_bps);
        tracing::info!(
            node = %self.profile.id,
            addr = %self.profile.address,
            neighbor,
            bandwidth_bps,
            "link configured"
        );
    }

    pub async fn connections(&self) -> Vec<String> {
        self.state.lock().await.connections.keys().cloned().collect()
    }

    pub async fn link_bandwidth(&self, neighbor: &str) -> Option<u64> {
        self.state.lock().await.connections.get(neighbor).copied()
    }

    // ── Transfer lifecycle ──────────────────────────────────────────────────

    /// Accept a transfer for eventual storage here.
    ///
    /// Storage is only charged at finalization, so concurrent reservations
    /// can together exceed free capacity.
    pub async fn reserve(
        &self,
        transfer_id: &str,
        name: &str,
        total_size: u64,
    ) -> Result<Transfer, ReserveError> {
        let mut state = self.state.lock().await;
        let free = self.profile.total_storage.saturating_sub(state.used_storage);
        if total_size > free {
            tracing::warn!(
                node = %self.profile.id,
                transfer_id,
                requested = total_size,
                free,
                "reservation rejected: insufficient storage"
            );
            return Err(ReserveError::InsufficientStorage {
                node: self.profile.id.clone(),
                requested: total_size,
                free,
            });
        }

        let transfer = Transfer::planned(transfer_id, name, total_size);
        tracing::debug!(
            node = %self.profile.id,
            transfer_id,
            chunks = transfer.chunks.len(),
            "reservation accepted"
        );
        state.active.insert(transfer_id.to_string(), transfer.clone());
        Ok(transfer)
    }

    /// Drop an in-flight record. Returns false if there was none.
    pub async fn cancel_reservation(&self, transfer_id: &str) -> bool {
        let removed = self.state.lock().await.active.remove(transfer_id).is_some();
        if removed {
            tracing::debug!(node = %self.profile.id, transfer_id, "reservation rolled back");
        }
        removed
    }

    /// Receive one chunk of `transfer_id` from `upstream`.
    ///
    /// Fails without side effects for unknown transfers or chunks. Fails
    /// with the failed-hop counter bumped when no bandwidth is available;
    /// the chunk stays pending so the same call can be retried later.
    pub async fn process_hop(
        &self,
        transfer_id: &str,
        chunk_index: u64,
        upstream: &str,
        is_final_hop: bool,
    ) -> Result<HopReport, HopError> {
        let _lane = self.hop_lane.lock().await;

        let (chunk_size, available, load) = {
            let mut state = self.state.lock().await;
            let transfer = state
                .active
                .get(transfer_id)
                .ok_or_else(|| HopError::UnknownTransfer(transfer_id.to_string()))?;
            let chunk_size = transfer
                .chunk(chunk_index)
                .ok_or_else(|| HopError::UnknownChunk {
                    transfer: transfer_id.to_string(),
                    index: chunk_index,
                })?
                .size;

            let link = state.connections.get(upstream).copied().unwrap_or(0);
            let headroom = self.profile.bandwidth as f64 - state.network_utilization;
            let available = headroom.min(link as f64);

            if available <= 0.0 {
                state.failed_hops += 1;
                tracing::warn!(
                    node = %self.profile.id,
                    transfer_id,
                    chunk = chunk_index,
                    upstream,
                    "no available bandwidth for chunk"
                );
                return Err(HopError::BandwidthExhausted {
                    node: self.profile.id.clone(),
                    upstream: upstream.to_string(),
                });
            }

            let load = available * HOP_LOAD_FACTOR;
            state.network_utilization = self.clamp_utilization(state.network_utilization + load);
            (chunk_size, available, load)
        };

        let transfer_time =
            Duration::try_from_secs_f64((chunk_size * 8) as f64 / available).unwrap_or(Duration::MAX);
        tracing::debug!(
            node = %self.profile.id,
            transfer_id,
            chunk = chunk_index,
            upstream,
            bandwidth_bps = available,
            secs = transfer_time.as_secs_f64(),
            "hop started"
        );

        tokio::time::sleep(transfer_time).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.network_utilization = self.clamp_utilization(state.network_utilization - load);

        let transfer = state
            .active
            .get_mut(transfer_id)
            .ok_or_else(|| HopError::UnknownTransfer(transfer_id.to_string()))?;
        if let Some(chunk) = transfer.chunk_mut(chunk_index) {
            chunk.status = ChunkStatus::Completed;
            chunk.holder = Some(self.profile.id.clone());
        }
        state.bytes_transferred += chunk_size;

        tracing::debug!(
            node = %self.profile.id,
            transfer_id,
            chunk = chunk_index,
            completed = transfer.completed_chunks(),
            total = transfer.chunks.len(),
            "hop completed"
        );

        let finalized = is_final_hop && transfer.all_chunks_completed();
        if finalized {
            self.finalize(state, transfer_id);
        }

        Ok(HopReport {
            bandwidth_bps: available,
            transfer_time,
            finalized,
        })
    }

    /// Charge storage and move the transfer into the finalized set.
    fn finalize(&self, state: &mut NodeState, transfer_id: &str) {
        let Some(mut transfer) = state.active.remove(transfer_id) else {
            return;
        };
        transfer.mark_completed();

        let charged = state.used_storage.saturating_add(transfer.total_size);
        if charged > self.profile.total_storage {
            tracing::warn!(
                node = %self.profile.id,
                transfer_id,
                used = state.used_storage,
                size = transfer.total_size,
                total = self.profile.total_storage,
                "finalization overcommits storage, clamping to capacity"
            );
        }
        state.used_storage = charged.min(self.profile.total_storage);
        state.requests_completed += 1;

        tracing::info!(
            node = %self.profile.id,
            addr = %self.profile.address,
            transfer_id,
            name = %transfer.name,
            stored_mb = transfer.total_size as f64 / (1024.0 * 1024.0),
            "file transfer completed"
        );
        state.stored.insert(transfer_id.to_string(), transfer);
    }

    fn clamp_utilization(&self, value: f64) -> f64 {
        value.clamp(0.0, self.profile.bandwidth as f64)
    }

    /// Describe exporting a finalized transfer to `destination`.
    pub async fn retrieve(&self, transfer_id: &str, destination: &str) -> Option<Transfer> {
        let state = self.state.lock().await;
        state
            .stored
            .get(transfer_id)
            .map(|t| t.retrieval_for(destination))
    }

    // ── Lookups ──────────────────────────────────────────────────────────────

    /// In-flight record for `transfer_id`.
    pub async fn transfer(&self, transfer_id: &str) -> Option<Transfer> {
        self.state.lock().await.active.get(transfer_id).cloned()
    }

    /// Finalized record for `transfer_id`.
    pub async fn stored_transfer(&self, transfer_id: &str) -> Option<Transfer> {
        self.state.lock().await.stored.get(transfer_id).cloned()
    }

    pub async fn has_stored(&self, transfer_id: &str) -> bool {
        self.state.lock().await.stored.contains_key(transfer_id)
    }

    pub async fn is_in_flight(&self, transfer_id: &str) -> bool {
        self.state.lock().await.active.contains_key(transfer_id)
    }

    /// Finalized transfers, oldest completion first.
    pub async fn stored_files(&self) -> Vec<Transfer> {
        let mut files: Vec<Transfer> = self.state.lock().await.stored.values().cloned().collect();
        files.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.id.cmp(&b.id)));
        files
    }

    pub async fn used_storage(&self) -> u64 {
        self.state.lock().await.used_storage
    }

    /// Hold the state lock until `until` resolves.
    #[cfg(test)]
    pub(crate) async fn hold_state_while<F: std::future::Future>(&self, until: F) -> F::Output {
        let _state = self.state.lock().await;
        until.await
    }

    // ── Metrics ──────────────────────────────────────────────────────────────

    pub async fn storage_utilization(&self) -> StorageUtilization {
        let state = self.state.lock().await;
        self.storage_of(&state)
    }

    pub async fn network_utilization(&self) -> NetworkUtilization {
        let state = self.state.lock().await;
        self.network_of(&state)
    }

    pub async fn performance_metrics(&self) -> PerformanceMetrics {
        let state = self.state.lock().await;
        Self::performance_of(&state)
    }

    /// All metrics from a single consistent read.
    pub async fn snapshot(&self) -> NodeSnapshot {
        let state = self.state.lock().await;
        NodeSnapshot {
            node_id: self.profile.id.clone(),
            address: self.profile.address,
            cpu_capacity: self.profile.cpu_capacity,
            memory_capacity: self.profile.memory_capacity,
            storage: self.storage_of(&state),
            network: self.network_of(&state),
            performance: Self::performance_of(&state),
        }
    }

    fn storage_of(&self, state: &NodeState) -> StorageUtilization {
        StorageUtilization {
            used_bytes: state.used_storage,
            total_bytes: self.profile.total_storage,
            utilization_percent: percent(
                state.used_storage as f64,
                self.profile.total_storage as f64,
            ),
            files_stored: state.stored.len(),
            active_transfers: state.active.len(),
        }
    }

    fn network_of(&self, state: &NodeState) -> NetworkUtilization {
        NetworkUtilization {
            current_utilization_bps: state.network_utilization,
            max_bandwidth_bps: self.profile.bandwidth,
            utilization_percent: percent(state.network_utilization, self.profile.bandwidth as f64),
            connections: state.connections.keys().cloned().collect(),
        }
    }

    fn performance_of(state: &NodeState) -> PerformanceMetrics {
        PerformanceMetrics {
            total_requests_processed: state.requests_completed,
            total_data_transferred_bytes: state.bytes_transferred,
            failed_transfers: state.failed_hops,
            current_active_transfers: state.active.len(),
        }
    }
}
