//! Transfer records: the per-node view of a file moving through the fabric.
//!
//! Every node on a route holds its own independent copy of a transfer.
//! Chunk progress is local to that copy: a chunk completed at an
//! intermediate hop says nothing about the destination.

use serde::{Deserialize, Serialize};

use crate::planner;

/// Length of the hex identifiers derived by this module.
const ID_HEX_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Completed,
}

/// A slice of a transfer. Failed hops leave a chunk `Pending`, which is
/// what makes it eligible for a later retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: u64,
    pub size: u64,
    /// Synthetic digest of (transfer id, index). Not a content hash.
    pub checksum: String,
    pub status: ChunkStatus,
    /// Node currently holding this chunk, once completed.
    pub holder: Option<String>,
}

impl Chunk {
    pub fn is_completed(&self) -> bool {
        self.status == ChunkStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub name: String,
    pub total_size: u64,
    pub chunks: Vec<Chunk>,
    pub status: TransferStatus,
    /// Unix timestamp in milliseconds
    pub created_at: u64,
    /// Unix timestamp in milliseconds
    pub completed_at: Option<u64>,
}

impl Transfer {
    /// Plan a fresh pending transfer for `total_size` bytes.
    pub fn planned(id: impl Into<String>, name: impl Into<String>, total_size: u64) -> Self {
        let id = id.into();
        let chunks = planner::plan(total_size)
            .into_iter()
            .map(|p| Chunk {
                index: p.index,
                size: p.size,
                checksum: chunk_checksum(&id, p.index),
                status: ChunkStatus::Pending,
                holder: None,
            })
            .collect();

        Self {
            id,
            name: name.into(),
            total_size,
            chunks,
            status: TransferStatus::Pending,
            created_at: unix_millis(),
            completed_at: None,
        }
    }

    pub fn chunk(&self, index: u64) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.index == index)
    }

    pub fn chunk_mut(&mut self, index: u64) -> Option<&mut Chunk> {
        self.chunks.iter_mut().find(|c| c.index == index)
    }

    pub fn completed_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_completed()).count()
    }

    /// True once every chunk has completed at this holder.
    pub fn all_chunks_completed(&self) -> bool {
        self.chunks.iter().all(Chunk::is_completed)
    }

    /// Indices of chunks not yet completed, in index order.
    pub fn pending_indices(&self) -> Vec<u64> {
        let mut pending: Vec<u64> = self
            .chunks
            .iter()
            .filter(|c| !c.is_completed())
            .map(|c| c.index)
            .collect();
        pending.sort_unstable();
        pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransferStatus::Completed
    }

    /// Mark the transfer completed now.
    pub fn mark_completed(&mut self) {
        self.status = TransferStatus::Completed;
        self.completed_at = Some(unix_millis());
    }

    /// Describe exporting this transfer to `destination`.
    ///
    /// The result is a new pending record whose chunks all name the
    /// destination as holder. Nothing is moved or registered.
    pub fn retrieval_for(&self, destination: &str) -> Transfer {
        Transfer {
            id: format!("retr-{}-{}", self.id, unix_millis()),
            name: self.name.clone(),
            total_size: self.total_size,
            chunks: self
                .chunks
                .iter()
                .map(|c| Chunk {
                    index: c.index,
                    size: c.size,
                    checksum: c.checksum.clone(),
                    status: ChunkStatus::Pending,
                    holder: Some(destination.to_string()),
                })
                .collect(),
            status: TransferStatus::Pending,
            created_at: unix_millis(),
            completed_at: None,
        }
    }
}

/// Derive a transfer id from the file name and submission time.
pub fn transfer_id(file_name: &str, submitted_at_nanos: u128) -> String {
    short_digest(format!("{file_name}-{submitted_at_nanos}").as_bytes())
}

/// Placeholder per-chunk checksum: digest of `"{transfer_id}-{index}"`.
pub fn chunk_checksum(transfer_id: &str, index: u64) -> String {
    short_digest(format!("{transfer_id}-{index}").as_bytes())
}

fn short_digest(input: &[u8]) -> String {
    let hash = blake3::hash(input);
    let mut hex = hex::encode(hash.as_bytes());
    hex.truncate(ID_HEX_LEN);
    hex
}

pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn unix_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
