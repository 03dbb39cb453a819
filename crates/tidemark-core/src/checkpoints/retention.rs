//! Retention and downsampling policy
//!
//! Both plans are pure: they decide what to drop and leave the deleting to
//! the manager.

use super::types::{CheckpointId, CheckpointSummary};
use crate::clock::Millis;

/// Start of the bucket containing `timestamp`
pub fn bucket_start(timestamp: Millis, bucket_ms: Millis) -> Millis {
    timestamp.div_euclid(bucket_ms) * bucket_ms
}

/// Snapshot timestamps to delete from one file's timeline
///
/// `timestamps` must be ascending. Only closed buckets (`now - start >
/// bucket_ms`) are thinned; each keeps its earliest and latest snapshot and
/// every snapshot sitting on a multiple of `sample_ms` from the bucket start.
pub fn plan_downsample(
    timestamps: &[Millis],
    now: Millis,
    bucket_ms: Millis,
    sample_ms: Millis,
) -> Vec<Millis> {
    let mut remove = Vec::new();
    let mut rest = timestamps;

    while let Some(&first) = rest.first() {
        let start = bucket_start(first, bucket_ms);
        let len = rest
            .iter()
            .position(|&ts| bucket_start(ts, bucket_ms) != start)
            .unwrap_or(rest.len());
        let (bucket, tail) = rest.split_at(len);
        rest = tail;

        if now - start <= bucket_ms || bucket.len() <= 2 {
            continue;
        }
        let interior = &bucket[1..bucket.len() - 1];
        remove.extend(
            interior
                .iter()
                .copied()
                .filter(|ts| (ts - start) % sample_ms != 0),
        );
    }

    remove
}

/// Checkpoints to evict so that at most `max` remain
///
/// `history` is ordered oldest first and the oldest entries go first,
/// the initial state included.
pub fn plan_eviction(history: &[CheckpointSummary], max: usize) -> Vec<CheckpointId> {
    let excess = history.len().saturating_sub(max);
    history[..excess].iter().map(|s| s.id.clone()).collect()
}
