//! fabric-services: storage nodes, topology, routing, and transfer orchestration.

pub mod metrics;
pub mod monitor;
pub mod node;
pub mod orchestrator;
pub mod topology;

pub use metrics::{
    ActiveTransfer, NetworkStats, NetworkUtilization, NodeSnapshot, PerformanceMetrics,
    StorageUtilization,
};
pub use monitor::{LifecycleError, LifecyclePhase};
pub use node::{HopError, HopReport, NodeProfile, ReserveError, StorageNode};
pub use orchestrator::{InitiateError, Network, StepOutcome};
pub use topology::Topology;
