//! Per-session tracker context.

use crate::clock::ClockTracker;
use crate::config::IngestConfig;
use crate::event::EventTracker;
use crate::probes::ProbesTracker;
use crate::process::ProcessTracker;
use crate::slice::SliceTracker;
use crate::storage::TraceStorage;
use crate::track::{AsyncTrackSetTracker, TrackTracker};

/// Everything one ingestion session mutates: storage plus all trackers.
///
/// Created at session start, consumed at session end. Never shared across
/// sessions; a concurrent trace load gets its own context.
#[derive(Debug)]
pub struct ProbeContext {
    pub storage: TraceStorage,
    pub clock: ClockTracker,
    pub process: ProcessTracker,
    pub tracks: TrackTracker,
    pub async_tracks: AsyncTrackSetTracker,
    pub events: EventTracker,
    pub slices: SliceTracker,
    pub probes: ProbesTracker,
}

impl ProbeContext {
    pub fn new(config: &IngestConfig) -> Self {
        ProbeContext {
            storage: TraceStorage::new(),
            clock: ClockTracker::new(config.trace_clock_id),
            process: ProcessTracker::new(),
            tracks: TrackTracker::new(),
            async_tracks: AsyncTrackSetTracker::new(),
            events: EventTracker::new(),
            slices: SliceTracker::new(),
            probes: ProbesTracker::new(),
        }
    }

    /// Tear down the trackers and hand the finished tables to the caller.
    pub fn into_storage(self) -> TraceStorage {
        let mut storage = self.storage;
        let (processes, threads) = self.process.into_tables();
        storage.set_identity_tables(processes, threads);
        storage
    }
}
