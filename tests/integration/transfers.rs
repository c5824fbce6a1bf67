//! End-to-end relaying, retry after bandwidth exhaustion, retrieval.

use anyhow::Result;
use fabric_core::planner::{KIB, MIB};
use fabric_core::{ChunkStatus, TransferStatus};
use fabric_services::{HopError, StepOutcome};

use crate::*;

#[tokio::test(start_paused = true)]
async fn test_two_hop_transfer_completes_exactly_once() -> Result<()> {
    let network = line(&["a", "b", "c"], GIB).await;
    let size = 300 * KIB;
    let t = network.initiate("a", "c", "report.pdf", size).await?;
    assert_eq!(t.chunks.len(), 1);

    let c = network.node("c").unwrap();
    let before = c.used_storage().await;

    let mut completions = 0;
    for _ in 0..5 {
        if network.step("a", "c", &t.id, 1).await.completed {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);

    assert!(c.has_stored(&t.id).await);
    assert_eq!(c.used_storage().await, before + size);
    assert!(!network.is_registered("a", &t.id));

    let stored = c.stored_transfer(&t.id).await.unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.chunks[0].holder.as_deref(), Some("c"));

    // The intermediate node relayed but does not store.
    let b = network.node("b").unwrap();
    assert!(!b.has_stored(&t.id).await);
    assert_eq!(b.used_storage().await, 0);
    assert_eq!(b.performance_metrics().await.total_data_transferred_bytes, size);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_link_fails_then_recovers() -> Result<()> {
    let network = line(&["a", "b"], GIB).await;
    let b = network.node("b").unwrap();
    let t = network.initiate("a", "b", "clip.mp4", 512 * KIB).await?;

    network.connect_nodes("a", "b", 0).await;
    let err = b.process_hop(&t.id, 0, "a", true).await.unwrap_err();
    assert!(matches!(err, HopError::BandwidthExhausted { .. }));
    assert_eq!(b.performance_metrics().await.failed_transfers, 1);
    let record = b.transfer(&t.id).await.unwrap();
    assert_eq!(record.chunks[0].status, ChunkStatus::Pending);

    assert_eq!(network.step("a", "b", &t.id, 1).await, StepOutcome::default());
    assert_eq!(b.performance_metrics().await.failed_transfers, 2);

    // Restore the link; the same chunk goes through.
    network.connect_nodes("a", "b", GBIT).await;
    let outcome = network.step("a", "b", &t.id, 1).await;
    assert_eq!(outcome.chunks_completed, 1);
    assert!(outcome.completed);
    assert_eq!(b.performance_metrics().await.failed_transfers, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_step_after_completion_is_noop() -> Result<()> {
    let network = line(&["a", "b"], GIB).await;
    let t = network.initiate("a", "b", "f", 100).await?;
    assert!(network.step("a", "b", &t.id, 3).await.completed);
    assert_eq!(network.step("a", "b", &t.id, 3).await, StepOutcome::default());
    assert_eq!(network.step("a", "b", "no-such-id", 3).await, StepOutcome::default());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_hop_time_follows_available_bandwidth() -> Result<()> {
    let network = line(&["a", "b"], GIB).await;
    let b = network.node("b").unwrap();
    // 1 MiB chunk over an 8 Mbit/s link.
    network.connect_nodes("a", "b", 8 * MIB).await;
    let t = network.initiate("a", "b", "f", MIB).await?;

    let started = tokio::time::Instant::now();
    let report = b.process_hop(&t.id, 0, "a", false).await?;
    let last = b.process_hop(&t.id, 1, "a", true).await?;
    assert_eq!(report.bandwidth_bps, (8 * MIB) as f64);
    assert_eq!(report.transfer_time.as_secs_f64(), 0.5);
    assert!(last.finalized);
    assert!(started.elapsed().as_secs_f64() >= 1.0);
    assert_eq!(b.network_utilization().await.current_utilization_bps, 0.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retrieve_describes_export_of_stored_file() -> Result<()> {
    let network = line(&["a", "b"], GIB).await;
    let t = network.initiate("a", "b", "photo.raw", 3 * MIB).await?;
    while !network.step("a", "b", &t.id, 2).await.completed {}

    let b = network.node("b").unwrap();
    let copy = b.retrieve(&t.id, "a").await.unwrap();
    assert!(copy.id.starts_with(&format!("retr-{}-", t.id)));
    assert_eq!(copy.total_size, 3 * MIB);
    assert!(b.retrieve("missing", "a").await.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_diamond_route_and_completion() -> Result<()> {
    let network = Network::new();
    for id in ["n1", "n2", "n3", "n4"] {
        network.add_node(node(id, GIB, 2 * GBIT));
    }
    network.connect_nodes("n1", "n3", 2 * GBIT).await;
    network.connect_nodes("n1", "n2", GBIT).await;
    network.connect_nodes("n2", "n4", GBIT).await;
    network.connect_nodes("n3", "n4", 2 * GBIT).await;

    assert_eq!(
        network.route("n1", "n4").await.unwrap(),
        vec!["n1", "n2", "n4"]
    );

    let t = network.initiate("n1", "n4", "large_dataset.zip", 100 * MIB).await?;
    assert_eq!(t.chunks.len(), 10);
    assert!(!network.node("n3").unwrap().is_in_flight(&t.id).await);

    let mut steps = 0;
    while !network.step("n1", "n4", &t.id, 3).await.completed {
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(network.node("n4").unwrap().used_storage().await, 100 * MIB);
    Ok(())
}
