//! Node lifecycle and background monitors.
//!
//! A running node owns three periodic activities:
//!   listener    heartbeat that the node is reachable
//!   storage     storage utilization report
//!   transfers   in-flight transfer report (silent when idle)
//!
//! Monitors only read node state, through the same mutex as every writer.
//! `stop()` signals them over a broadcast channel and waits a bounded time
//! for each; a monitor that misses the bound is left detached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::node::StorageNode;

pub(crate) enum Lifecycle {
    Unstarted,
    Running {
        shutdown: broadcast::Sender<()>,
        monitors: Vec<(&'static str, JoinHandle<()>)>,
    },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Unstarted,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("node {0} is stopped and cannot be restarted")]
    Stopped(String),
}

impl StorageNode {
    /// Launch the background monitors. A no-op if they are already running.
    pub async fn start(self: &Arc<Self>) -> Result<(), LifecycleError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Running { .. } => {
                tracing::debug!(node = %self.id(), "monitors already started");
                return Ok(());
            }
            Lifecycle::Stopped => return Err(LifecycleError::Stopped(self.id().to_string())),
            Lifecycle::Unstarted => {}
        }

        let (shutdown, _) = broadcast::channel::<()>(1);

        let listener = {
            let node = self.clone();
            every(self.monitor.listen_interval(), shutdown.subscribe(), move || {
                let node = node.clone();
                async move {
                    tracing::debug!(
                        node = %node.id(),
                        addr = %node.address(),
                        "listening for incoming connections"
                    );
                }
            })
        };

        let storage = {
            let node = self.clone();
            every(self.monitor.storage_report_interval(), shutdown.subscribe(), move || {
                let node = node.clone();
                async move {
                    let usage = node.storage_utilization().await;
                    tracing::info!(
                        node = %node.id(),
                        used_bytes = usage.used_bytes,
                        percent = usage.utilization_percent,
                        "storage utilization"
                    );
                }
            })
        };

        let transfers = {
            let node = self.clone();
            every(self.monitor.transfer_report_interval(), shutdown.subscribe(), move || {
                let node = node.clone();
                async move {
                    let active = node.performance_metrics().await.current_active_transfers;
                    if active > 0 {
                        tracing::info!(node = %node.id(), active, "handling active transfers");
                    }
                }
            })
        };

        *lifecycle = Lifecycle::Running {
            shutdown,
            monitors: vec![
                ("listener", tokio::spawn(listener)),
                ("storage", tokio::spawn(storage)),
                ("transfers", tokio::spawn(transfers)),
            ],
        };
        tracing::info!(node = %self.id(), addr = %self.address(), "node started");
        Ok(())
    }

    /// Signal all monitors and wait up to the configured bound for each.
    ///
    /// Stopping is terminal, including for a node that never started.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped);

        if let Lifecycle::Running { shutdown, monitors } = previous {
            let _ = shutdown.send(());
            let wait = self.monitor.stop_timeout();
            for (name, handle) in monitors {
                if tokio::time::timeout(wait, handle).await.is_err() {
                    tracing::warn!(
                        node = %self.id(),
                        monitor = name,
                        wait_ms = wait.as_millis() as u64,
                        "monitor did not stop in time, detaching"
                    );
                }
            }
        }
        tracing::info!(node = %self.id(), "node stopped");
    }

    pub async fn phase(&self) -> LifecyclePhase {
        match *self.lifecycle.lock().await {
            Lifecycle::Unstarted => LifecyclePhase::Unstarted,
            Lifecycle::Running { .. } => LifecyclePhase::Running,
            Lifecycle::Stopped => LifecyclePhase::Stopped,
        }
    }
}

/// Run `report` every `period` until `shutdown` fires or its sender is dropped.
async fn every<F, Fut>(period: Duration, mut shutdown: broadcast::Receiver<()>, mut report: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => report().await,
        }
    }
}
