//! Counter sample recording.

use crate::storage::TraceStorage;
use crate::trace::CounterRecord;
use crate::track::TrackId;

/// Appends counter samples to a track's series.
///
/// Samples are accepted in arbitrary timestamp order at O(1) cost; the
/// chronological view is produced by [`TraceStorage::counters_sorted`] at
/// query time, so ingestion throughput is independent of arrival order.
#[derive(Debug, Default)]
pub struct EventTracker;

impl EventTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn push_counter(&mut self, storage: &mut TraceStorage, ts: i64, value: f64, track: TrackId) {
        storage.push_counter(CounterRecord { ts, track, value });
    }
}
