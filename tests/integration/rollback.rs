//! Storage capacity and all-or-nothing reservation.

use anyhow::Result;
use fabric_core::planner::{KIB, MIB};
use fabric_services::{InitiateError, Network, ReserveError};

use crate::*;

/// a - b - c where c is too small for the file.
async fn short_tail() -> Network {
    let network = Network::new();
    network.add_node(node("a", GIB, GBIT));
    network.add_node(node("b", GIB, GBIT));
    network.add_node(node("c", MIB, GBIT));
    network.connect_nodes("a", "b", GBIT).await;
    network.connect_nodes("b", "c", GBIT).await;
    network
}

#[tokio::test]
async fn test_rejection_on_last_node_rolls_back_whole_path() {
    let network = short_tail().await;

    let err = network.initiate("a", "c", "big.iso", 2 * MIB).await.unwrap_err();
    assert_eq!(
        err,
        InitiateError::Rejected(ReserveError::InsufficientStorage {
            node: "c".into(),
            requested: 2 * MIB,
            free: MIB,
        })
    );

    for id in ["a", "b", "c"] {
        let storage = network.node(id).unwrap().storage_utilization().await;
        assert_eq!(storage.active_transfers, 0, "{id} kept a reservation");
        assert_eq!(storage.used_bytes, 0);
    }
    assert_eq!(network.stats().await.active_transfers, 0);
    assert!(network.active_transfers().await.is_empty());
}

#[tokio::test]
async fn test_file_that_fits_is_accepted_on_same_path() {
    let network = short_tail().await;
    let t = network.initiate("a", "c", "small.txt", 512 * KIB).await.unwrap();
    assert!(network.is_registered("a", &t.id));
    for id in ["a", "b", "c"] {
        assert!(network.node(id).unwrap().is_in_flight(&t.id).await);
    }
}

#[tokio::test(start_paused = true)]
async fn test_used_storage_never_exceeds_total() -> Result<()> {
    // Two reservations each fit alone, together they overcommit b.
    let network = line(&["a", "b"], MIB).await;
    let first = network.initiate("a", "b", "one", 768 * KIB).await?;
    let second = network.initiate("a", "b", "two", 768 * KIB).await?;

    for id in [&first.id, &second.id] {
        while !network.step("a", "b", id, 4).await.completed {}
    }

    let b = network.node("b").unwrap();
    let storage = b.storage_utilization().await;
    assert!(storage.used_bytes <= storage.total_bytes);
    assert_eq!(storage.files_stored, 2);

    // A full node rejects anything further.
    assert!(matches!(
        network.initiate("a", "b", "three", 1).await,
        Err(InitiateError::Rejected(_))
    ));
    Ok(())
}
