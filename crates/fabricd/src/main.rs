//! fabricd: storage fabric simulation daemon.

use std::sync::Arc;

use anyhow::{Context, Result};

use fabric_api::ApiState;
use fabric_core::config::FabricConfig;

mod scenario;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = FabricConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = FabricConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FabricConfig::default()
    });
    tracing::info!(
        nodes = config.topology.nodes.len(),
        links = config.topology.links.len(),
        transfers = config.topology.transfers.len(),
        "fabricd starting"
    );

    // Topology
    let network = Arc::new(scenario::build_network(&config).await);
    network
        .start_all()
        .await
        .context("failed to start node monitors")?;

    // Shutdown broadcast
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // HTTP API
    let api_task = if config.api.enabled {
        let state = ApiState::new(network.clone());
        let port = config.api.port;
        Some(tokio::spawn(async move {
            if let Err(e) = fabric_api::serve(state, port).await {
                tracing::error!(error = %e, "API server exited");
            }
        }))
    } else {
        None
    };

    // ── Drive transfers ──────────────────────────────────────────────────────

    let mut exit_rx = shutdown_tx.subscribe();
    let jobs = scenario::submit(&network, &config.topology.transfers).await;
    let summary =
        scenario::drive(&network, jobs, &config.simulation, shutdown_tx.subscribe()).await;

    let stats = network.stats().await;
    tracing::info!(
        steps = summary.steps,
        completed = summary.completed.len(),
        unfinished = summary.unfinished.len(),
        used_storage_bytes = stats.used_storage_bytes,
        storage_pct = stats.storage_utilization,
        "simulation finished"
    );

    // ── Wait for exit ────────────────────────────────────────────────────────

    if let Some(api_task) = api_task {
        if !summary.interrupted {
            tracing::info!(port = config.api.port, "serving status until Ctrl-C");
            tokio::select! {
                _ = exit_rx.recv()     => tracing::info!("shutting down"),
                r = api_task           => tracing::error!("API task exited: {:?}", r),
            }
        } else {
            api_task.abort();
        }
    }

    network.stop_all().await;
    Ok(())
}
