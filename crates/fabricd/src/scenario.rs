//! Builds the configured network and drives its transfers to completion.

use tokio::sync::broadcast;

use fabric_core::config::{FabricConfig, SimulationConfig, TransferJobConfig};
use fabric_services::{Network, StorageNode};

/// A transfer accepted by the network and awaiting completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: String,
    pub target: String,
    pub transfer_id: String,
    pub file_name: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DriveSummary {
    /// Polls made. Each poll steps every unfinished job once.
    pub steps: u64,
    pub completed: Vec<Job>,
    pub unfinished: Vec<Job>,
    /// True if shutdown cut the run short.
    pub interrupted: bool,
}

/// Register the configured nodes and links.
///
/// Links naming an unknown node are logged and skipped.
pub async fn build_network(config: &FabricConfig) -> Network {
    let network = Network::new();
    for node in &config.topology.nodes {
        network.add_node(StorageNode::from_config(node, config.monitor.clone()));
        tracing::info!(
            node = %node.id,
            addr = %node.address,
            storage_gb = node.storage_gb,
            bandwidth_mbps = node.bandwidth_mbps,
            "node registered"
        );
    }
    for link in &config.topology.links {
        if network
            .connect_nodes(&link.a, &link.b, link.bandwidth_bps())
            .await
        {
            tracing::info!(a = %link.a, b = %link.b, mbps = link.bandwidth_mbps, "link up");
        } else {
            tracing::warn!(a = %link.a, b = %link.b, "skipping link to unknown node");
        }
    }
    network
}

/// Initiate every configured transfer. Rejected ones are logged and dropped.
pub async fn submit(network: &Network, transfers: &[TransferJobConfig]) -> Vec<Job> {
    let mut jobs = Vec::with_capacity(transfers.len());
    for t in transfers {
        match network
            .initiate(&t.source, &t.target, &t.file_name, t.file_size_bytes)
            .await
        {
            Ok(record) => jobs.push(Job {
                source: t.source.clone(),
                target: t.target.clone(),
                transfer_id: record.id,
                file_name: t.file_name.clone(),
            }),
            Err(e) => tracing::warn!(
                source = %t.source,
                target = %t.target,
                file = %t.file_name,
                error = %e,
                "transfer rejected"
            ),
        }
    }
    jobs
}

/// Step every job until all complete, `max_steps` polls elapse, or shutdown.
///
/// Polls are `step_pacing` apart; each moves at most `chunks_per_step`
/// chunks of each job.
pub async fn drive(
    network: &Network,
    jobs: Vec<Job>,
    simulation: &SimulationConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> DriveSummary {
    let mut summary = DriveSummary::default();
    let mut pending = jobs;

    while !pending.is_empty() {
        if simulation.max_steps > 0 && summary.steps >= simulation.max_steps {
            tracing::warn!(
                steps = summary.steps,
                unfinished = pending.len(),
                "step limit reached"
            );
            break;
        }
        summary.steps += 1;

        let mut still_pending = Vec::with_capacity(pending.len());
        for job in pending {
            let outcome = network
                .step(
                    &job.source,
                    &job.target,
                    &job.transfer_id,
                    simulation.chunks_per_step,
                )
                .await;
            tracing::debug!(
                transfer_id = %job.transfer_id,
                chunks = outcome.chunks_completed,
                "step"
            );
            if outcome.completed {
                tracing::info!(
                    transfer_id = %job.transfer_id,
                    file = %job.file_name,
                    steps = summary.steps,
                    "transfer finished"
                );
                summary.completed.push(job);
            } else {
                still_pending.push(job);
            }
        }
        pending = still_pending;

        let stats = network.stats().await;
        tracing::info!(
            step = summary.steps,
            active = stats.active_transfers,
            storage_pct = stats.storage_utilization,
            bandwidth_pct = stats.bandwidth_utilization,
            "network stats"
        );

        if pending.is_empty() {
            break;
        }
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(unfinished = pending.len(), "driver interrupted");
                summary.interrupted = true;
                break;
            }
            _ = tokio::time::sleep(simulation.step_pacing()) => {}
        }
    }

    summary.unfinished = pending;
    summary
}
