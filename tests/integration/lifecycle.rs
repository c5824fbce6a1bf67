//! Node start/stop with monitors running alongside transfers.

use std::time::Duration;

use anyhow::Result;
use fabric_core::planner::MIB;
use fabric_services::{LifecycleError, LifecyclePhase};

use crate::*;

#[tokio::test(start_paused = true)]
async fn test_transfer_completes_with_monitors_running() -> Result<()> {
    let network = line(&["a", "b", "c"], GIB).await;
    network.start_all().await?;

    let t = network.initiate("a", "c", "f", 3 * MIB).await?;
    while !network.step("a", "c", &t.id, 1).await.completed {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    network.stop_all().await;
    for id in ["a", "b", "c"] {
        assert_eq!(network.node(id).unwrap().phase().await, LifecyclePhase::Stopped);
    }
    assert_eq!(network.node("c").unwrap().used_storage().await, 3 * MIB);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stopped_network_cannot_restart() {
    let network = line(&["a", "b"], GIB).await;
    network.start_all().await.unwrap();
    network.stop_all().await;
    assert_eq!(
        network.start_all().await,
        Err(LifecycleError::Stopped("a".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stopped_node_still_answers_queries() -> Result<()> {
    let network = line(&["a", "b"], GIB).await;
    network.start_all().await?;
    network.stop_all().await;

    // Stopping only ends the monitors.
    let t = network.initiate("a", "b", "late.txt", 10).await?;
    assert!(network.step("a", "b", &t.id, 1).await.completed);
    Ok(())
}
