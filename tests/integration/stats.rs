//! Network-wide aggregates.

use anyhow::Result;
use fabric_core::planner::MIB;
use fabric_services::Network;

use crate::*;

#[tokio::test]
async fn test_empty_network_reports_zero_percent() {
    let stats = Network::new().stats().await;
    assert_eq!(stats.total_nodes, 0);
    assert_eq!(stats.storage_utilization, 0.0);
    assert_eq!(stats.bandwidth_utilization, 0.0);
    assert_eq!(stats.active_transfers, 0);
}

#[tokio::test]
async fn test_zero_capacity_nodes_report_zero_percent() {
    let network = Network::new();
    network.add_node(node("hollow", 0, 0));
    let stats = network.stats().await;
    assert_eq!(stats.total_nodes, 1);
    assert_eq!(stats.total_storage_bytes, 0);
    assert_eq!(stats.storage_utilization, 0.0);
    assert_eq!(stats.bandwidth_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_stats_sum_over_nodes() -> Result<()> {
    let network = line(&["a", "b", "c"], GIB).await;
    let t = network.initiate("a", "c", "f", 4 * MIB).await?;

    let stats = network.stats().await;
    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.total_storage_bytes, 3 * GIB);
    assert_eq!(stats.total_bandwidth_bps, 3 * GBIT);
    assert_eq!(stats.active_transfers, 1);

    while !network.step("a", "c", &t.id, 8).await.completed {}

    let stats = network.stats().await;
    assert_eq!(stats.used_storage_bytes, 4 * MIB);
    assert_eq!(stats.active_transfers, 0);
    let expected = (4 * MIB) as f64 / (3 * GIB) as f64 * 100.0;
    assert!((stats.storage_utilization - expected).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_node_snapshot_lists_links_in_order() {
    let network = Network::new();
    for id in ["hub", "z", "m"] {
        network.add_node(node(id, GIB, GBIT));
    }
    network.connect_nodes("hub", "z", GBIT).await;
    network.connect_nodes("hub", "m", GBIT).await;

    let snapshot = network.node("hub").unwrap().snapshot().await;
    assert_eq!(snapshot.network.connections, vec!["z", "m"]);
    assert_eq!(snapshot.network.max_bandwidth_bps, GBIT);
    assert_eq!(snapshot.cpu_capacity, 4);
}
