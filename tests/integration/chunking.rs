use fabric_core::planner::{KIB, MIB};
use fabric_core::{plan, Transfer};

#[test]
fn test_small_file_uses_half_mebibyte_chunks() {
    let chunks = plan(5 * MIB);
    assert_eq!(chunks.len(), 10);
    assert!(chunks.iter().all(|c| c.size == 512 * KIB));
}

#[test]
fn test_medium_file_uses_two_mebibyte_chunks() {
    let chunks = plan(50 * MIB);
    assert_eq!(chunks.len(), 25);
    assert!(chunks.iter().all(|c| c.size == 2 * MIB));
}

#[test]
fn test_large_file_uses_ten_mebibyte_chunks() {
    let chunks = plan(150 * MIB);
    assert_eq!(chunks.len(), 15);
    assert_eq!(chunks.last().map(|c| c.size), Some(10 * MIB));
}

#[test]
fn test_tier_boundaries() {
    assert_eq!(plan(10 * MIB - 1)[0].size, 512 * KIB);
    assert_eq!(plan(10 * MIB)[0].size, 2 * MIB);
    assert_eq!(plan(100 * MIB - 1)[0].size, 2 * MIB);
    assert_eq!(plan(100 * MIB)[0].size, 10 * MIB);
}

#[test]
fn test_chunks_cover_the_file_exactly() {
    for size in [1, 512 * KIB + 1, 10 * MIB + 7, 333 * MIB + 5] {
        let chunks = plan(size);
        assert_eq!(chunks.iter().map(|c| c.size).sum::<u64>(), size, "{size}");
        let last = chunks.last().map(|c| c.size).unwrap_or(0);
        assert!(last > 0 && last <= chunks[0].size);
        assert!(chunks.iter().enumerate().all(|(i, c)| c.index as usize == i));
    }
}

#[test]
fn test_planned_transfer_starts_pending_with_checksums() {
    let t = Transfer::planned("abc", "f.bin", 3 * 512 * KIB);
    assert_eq!(t.chunks.len(), 3);
    assert_eq!(t.completed_chunks(), 0);
    assert!(!t.is_completed());
    assert!(t.chunks.iter().all(|c| c.holder.is_none()));
    assert_ne!(t.chunks[0].checksum, t.chunks[1].checksum);
}
