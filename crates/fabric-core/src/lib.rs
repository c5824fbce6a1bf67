//! fabric-core: shared data model, chunk planning, and configuration.
//! All other fabric crates depend on this one.

pub mod config;
pub mod planner;
pub mod transfer;

pub use planner::{chunk_at, plan, PlannedChunk};
pub use transfer::{Chunk, ChunkStatus, Transfer, TransferStatus};
