//! Chunk planner. Maps a file size onto a fixed chunk-size tier.
//!
//! Tiers:
//!   size <  10 MiB  → 512 KiB chunks
//!   size < 100 MiB  →   2 MiB chunks
//!   otherwise       →  10 MiB chunks
//!
//! The last chunk carries the remainder and is never empty.

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

const SMALL_FILE_LIMIT: u64 = 10 * MIB;
const MEDIUM_FILE_LIMIT: u64 = 100 * MIB;

pub const SMALL_CHUNK_SIZE: u64 = 512 * KIB;
pub const MEDIUM_CHUNK_SIZE: u64 = 2 * MIB;
pub const LARGE_CHUNK_SIZE: u64 = 10 * MIB;

/// One slice of a planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedChunk {
    pub index: u64,
    pub size: u64,
}

/// Chunk size tier for a file of `total_size` bytes.
pub fn chunk_size_for(total_size: u64) -> u64 {
    if total_size < SMALL_FILE_LIMIT {
        SMALL_CHUNK_SIZE
    } else if total_size < MEDIUM_FILE_LIMIT {
        MEDIUM_CHUNK_SIZE
    } else {
        LARGE_CHUNK_SIZE
    }
}

/// Split `total_size` bytes into `ceil(total_size / chunk_size)` chunks.
///
/// A zero-byte file plans to zero chunks.
pub fn plan(total_size: u64) -> Vec<PlannedChunk> {
    let chunk_size = chunk_size_for(total_size);
    let count = total_size.div_ceil(chunk_size);

    (0..count).filter_map(|i| chunk_at(total_size, i)).collect()
}

/// The `index`th chunk of a `total_size`-byte plan, without planning the rest.
pub fn chunk_at(total_size: u64, index: u64) -> Option<PlannedChunk> {
    let chunk_size = chunk_size_for(total_size);
    let offset = index.checked_mul(chunk_size)?;
    if offset >= total_size {
        return None;
    }
    Some(PlannedChunk {
        index,
        size: chunk_size.min(total_size - offset),
    })
}
