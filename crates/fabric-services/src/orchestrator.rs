//! Transfer orchestrator: all-or-nothing reservation along a route, then
//! chunk-by-chunk, hop-by-hop relaying driven by repeated `step` calls.
//!
//! Nothing here runs on its own. A caller polls `step` until the
//! destination reports the transfer finalized.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;

use fabric_core::transfer::{transfer_id, unix_nanos};
use fabric_core::Transfer;

use crate::metrics::{percent, ActiveTransfer, NetworkStats};
use crate::monitor::LifecycleError;
use crate::node::{ReserveError, StorageNode};
use crate::topology::Topology;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitiateError {
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("refusing to transfer an empty file")]
    EmptyFile,
    #[error("source and target are both {0}; a transfer needs at least one hop")]
    NoHop(String),
    #[error("no route from {from} to {to}")]
    NoRoute { from: String, to: String },
    #[error("reservation rejected: {0}")]
    Rejected(#[from] ReserveError),
}

/// Result of one `step` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Chunks that made it through every hop during this call.
    pub chunks_completed: usize,
    /// True exactly once: on the call that observed finalization.
    pub completed: bool,
}

/// (source node, transfer id) → destination node id.
type TransferRegistry = DashMap<(String, String), String>;

#[derive(Default)]
pub struct Network {
    topology: Topology,
    registry: TransferRegistry,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn add_node(&self, node: StorageNode) -> Arc<StorageNode> {
        self.topology.add_node(node)
    }

    pub fn node(&self, id: &str) -> Option<Arc<StorageNode>> {
        self.topology.node(id)
    }

    pub async fn connect_nodes(&self, a: &str, b: &str, bandwidth_bps: u64) -> bool {
        self.topology.connect_nodes(a, b, bandwidth_bps).await
    }

    pub async fn route(&self, source: &str, target: &str) -> Option<Vec<String>> {
        self.topology.route(source, target).await
    }

    /// True while `(source, transfer_id)` awaits finalization.
    pub fn is_registered(&self, source: &str, transfer_id: &str) -> bool {
        self.registry
            .contains_key(&(source.to_string(), transfer_id.to_string()))
    }

    /// Reserve `size` bytes for `name` at every node from `source` to `target`.
    ///
    /// If any node rejects, reservations already made for this transfer are
    /// removed before returning. On success the destination's record is
    /// returned and the transfer is registered for stepping.
    pub async fn initiate(
        &self,
        source: &str,
        target: &str,
        name: &str,
        size: u64,
    ) -> Result<Transfer, InitiateError> {
        for id in [source, target] {
            if !self.topology.contains(id) {
                return Err(InitiateError::UnknownNode(id.to_string()));
            }
        }
        if size == 0 {
            return Err(InitiateError::EmptyFile);
        }
        if source == target {
            return Err(InitiateError::NoHop(source.to_string()));
        }

        let path = self
            .topology
            .route(source, target)
            .await
            .ok_or_else(|| InitiateError::NoRoute {
                from: source.to_string(),
                to: target.to_string(),
            })?;

        let id = transfer_id(name, unix_nanos());
        let mut accepted: Vec<Arc<StorageNode>> = Vec::with_capacity(path.len());
        let mut destination_record = None;

        for node_id in &path {
            let Some(node) = self.topology.node(node_id) else {
                Self::roll_back(&accepted, &id).await;
                return Err(InitiateError::UnknownNode(node_id.clone()));
            };
            match node.reserve(&id, name, size).await {
                Ok(transfer) => {
                    accepted.push(node);
                    destination_record = Some(transfer);
                }
                Err(e) => {
                    Self::roll_back(&accepted, &id).await;
                    tracing::warn!(
                        transfer_id = %id,
                        node = %node_id,
                        rolled_back = accepted.len(),
                        "not enough storage to initiate transfer"
                    );
                    return Err(e.into());
                }
            }
        }

        // The route ends at the target, so the last reservation is its record.
        let Some(record) = destination_record else {
            return Err(InitiateError::NoRoute {
                from: source.to_string(),
                to: target.to_string(),
            });
        };

        self.registry
            .insert((source.to_string(), id.clone()), target.to_string());
        tracing::info!(
            transfer_id = %id,
            name,
            size,
            chunks = record.chunks.len(),
            route = %path.join(" → "),
            "transfer initiated"
        );
        Ok(record)
    }

    async fn roll_back(accepted: &[Arc<StorageNode>], transfer_id: &str) {
        for node in accepted {
            node.cancel_reservation(transfer_id).await;
        }
    }

    /// Attempt up to `max_chunks` of the destination's pending chunks.
    ///
    /// Each attempt walks the current route in order and stops at the first
    /// failed hop; that chunk stays pending for a later call. Returns
    /// `completed = true` once the destination has finalized, after which the
    /// transfer is unregistered and further calls are no-ops.
    pub async fn step(
        &self,
        source: &str,
        target: &str,
        transfer_id: &str,
        max_chunks: usize,
    ) -> StepOutcome {
        let key = (source.to_string(), transfer_id.to_string());
        let registered_target = self.registry.get(&key).map(|e| e.value().clone());
        if registered_target.as_deref() != Some(target) {
            return StepOutcome::default();
        }

        let Some(path) = self.topology.route(source, target).await else {
            return StepOutcome::default();
        };
        let Some(hops) = self.resolve_hops(&path) else {
            return StepOutcome::default();
        };
        let Some(destination) = self.topology.node(target) else {
            return StepOutcome::default();
        };

        let pending = destination
            .transfer(transfer_id)
            .await
            .map(|t| t.pending_indices())
            .unwrap_or_default();

        let mut chunks_completed = 0;
        for index in pending.into_iter().take(max_chunks) {
            if Self::relay_chunk(&hops, transfer_id, index, target).await {
                chunks_completed += 1;
            }
        }

        // Only the call that unregisters the transfer reports completion.
        let completed =
            destination.has_stored(transfer_id).await && self.registry.remove(&key).is_some();
        if completed {
            tracing::info!(transfer_id, source, target, "transfer completed");
        }

        StepOutcome {
            chunks_completed,
            completed,
        }
    }

    /// Pair each receiving node on `path` with its upstream neighbor.
    fn resolve_hops(&self, path: &[String]) -> Option<Vec<(String, Arc<StorageNode>)>> {
        path.windows(2)
            .map(|w| self.topology.node(&w[1]).map(|node| (w[0].clone(), node)))
            .collect()
    }

    async fn relay_chunk(
        hops: &[(String, Arc<StorageNode>)],
        transfer_id: &str,
        index: u64,
        target: &str,
    ) -> bool {
        for (upstream, node) in hops {
            let is_final_hop = node.id() == target;
            if let Err(e) = node
                .process_hop(transfer_id, index, upstream, is_final_hop)
                .await
            {
                tracing::debug!(
                    transfer_id,
                    chunk = index,
                    node = %node.id(),
                    error = %e,
                    "hop failed, chunk left pending"
                );
                return false;
            }
        }
        true
    }

    /// Network-wide sums, saturating at `u64::MAX`. Ratios over an empty total are 0.
    pub async fn stats(&self) -> NetworkStats {
        let nodes = self.topology.nodes();
        let snapshots = join_all(nodes.iter().map(|n| n.snapshot())).await;

        let total_bandwidth_bps = snapshots
            .iter()
            .map(|s| s.network.max_bandwidth_bps)
            .fold(0u64, u64::saturating_add);
        let used_bandwidth_bps: f64 = snapshots
            .iter()
            .map(|s| s.network.current_utilization_bps)
            .sum();
        let total_storage_bytes = snapshots
            .iter()
            .map(|s| s.storage.total_bytes)
            .fold(0u64, u64::saturating_add);
        let used_storage_bytes = snapshots
            .iter()
            .map(|s| s.storage.used_bytes)
            .fold(0u64, u64::saturating_add);

        NetworkStats {
            total_nodes: nodes.len(),
            total_bandwidth_bps,
            used_bandwidth_bps,
            bandwidth_utilization: percent(used_bandwidth_bps, total_bandwidth_bps as f64),
            total_storage_bytes,
            used_storage_bytes,
            storage_utilization: percent(used_storage_bytes as f64, total_storage_bytes as f64),
            active_transfers: self.registry.len(),
        }
    }

    /// Registered transfers with their progress at the destination.
    pub async fn active_transfers(&self) -> Vec<ActiveTransfer> {
        let mut entries: Vec<(String, String, String)> = self
            .registry
            .iter()
            .map(|e| (e.key().0.clone(), e.key().1.clone(), e.value().clone()))
            .collect();
        entries.sort();

        let mut active = Vec::with_capacity(entries.len());
        for (source, transfer_id, target) in entries {
            let record = match self.topology.node(&target) {
                Some(node) => node.transfer(&transfer_id).await,
                None => None,
            };
            let (name, total_size, completed_chunks, total_chunks) = match record {
                Some(t) => (t.name.clone(), t.total_size, t.completed_chunks(), t.chunks.len()),
                None => (String::new(), 0, 0, 0),
            };
            active.push(ActiveTransfer {
                source,
                target,
                transfer_id,
                name,
                total_size,
                completed_chunks,
                total_chunks,
            });
        }
        active
    }

    /// Start every node's monitors.
    pub async fn start_all(&self) -> Result<(), LifecycleError> {
        for node in self.topology.nodes() {
            node.start().await?;
        }
        Ok(())
    }

    pub async fn stop_all(&self) {
        for node in self.topology.nodes() {
            node.stop().await;
        }
    }
}
