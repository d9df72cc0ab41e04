//! Track interning.
//!
//! Tracks are named timelines. Global counter tracks are interned by name:
//! the same name always resolves to the same [`TrackId`] for the lifetime of
//! the trace. Async track sets carry possibly-overlapping interval sequences
//! under one logical name by fanning occurrences out over lanes, so begin/end
//! pairs never overlap within one lane.

use std::collections::HashMap;

use crate::interner::StringId;
use crate::storage::TraceStorage;
use crate::trace::{TrackKind, TrackRecord};

/// Identifies one named timeline (a row of the track table).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackId(u32);

impl TrackId {
    pub(crate) fn from_row(row: usize) -> TrackId {
        TrackId(row as u32)
    }

    pub fn row(self) -> usize {
        self.0 as usize
    }
}

/// Identifies an async track set; stable for the session lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackSetId(u32);

#[derive(Debug, Default)]
pub struct TrackTracker {
    global_counter_tracks: HashMap<StringId, TrackId>,
}

impl TrackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup-or-create of the one global counter track for `name`.
    pub fn intern_global_counter_track(
        &mut self,
        storage: &mut TraceStorage,
        name: StringId,
    ) -> TrackId {
        if let Some(&track) = self.global_counter_tracks.get(&name) {
            return track;
        }
        let track = storage.push_track(TrackRecord {
            name,
            kind: TrackKind::Counter,
        });
        self.global_counter_tracks.insert(name, track);
        track
    }
}

#[derive(Debug)]
struct Lane {
    track: TrackId,
    // Correlation cookie currently bound to this lane; None when free.
    cookie: Option<i64>,
    nest_count: u32,
    busy_until: i64,
}

#[derive(Debug)]
struct TrackSet {
    name: StringId,
    lanes: Vec<Lane>,
}

#[derive(Debug, Default)]
pub struct AsyncTrackSetTracker {
    sets: Vec<TrackSet>,
    by_name: HashMap<StringId, TrackSetId>,
}

impl AsyncTrackSetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup-or-create of the global async track set for `name`.
    pub fn intern_global_track_set(&mut self, name: StringId) -> TrackSetId {
        if let Some(&set) = self.by_name.get(&name) {
            return set;
        }
        let set = TrackSetId(self.sets.len() as u32);
        self.sets.push(TrackSet {
            name,
            lanes: Vec::new(),
        });
        self.by_name.insert(name, set);
        set
    }

    /// Open an interval correlated by `cookie`; nested begins with the same
    /// cookie stay on the same lane.
    pub fn begin(&mut self, storage: &mut TraceStorage, set: TrackSetId, cookie: i64) -> TrackId {
        let track_set = &mut self.sets[set.0 as usize];
        if let Some(lane) = track_set.lanes.iter_mut().find(|l| l.cookie == Some(cookie)) {
            lane.nest_count += 1;
            return lane.track;
        }
        // Claim a lane whose previous correlation has fully ended.
        if let Some(lane) = track_set
            .lanes
            .iter_mut()
            .find(|l| l.cookie.is_none() && l.nest_count == 0)
        {
            lane.cookie = Some(cookie);
            lane.nest_count = 1;
            return lane.track;
        }
        self.new_lane(storage, set, Some(cookie), 1, 0)
    }

    /// Close the innermost open interval correlated by `cookie`. Returns
    /// None for an end with no matching begin.
    pub fn end(&mut self, set: TrackSetId, cookie: i64) -> Option<TrackId> {
        let lane = Self::lane_for_cookie(&mut self.sets[set.0 as usize], cookie)?;
        lane.nest_count = lane.nest_count.saturating_sub(1);
        if lane.nest_count == 0 {
            lane.cookie = None;
        }
        Some(lane.track)
    }

    /// Lane for one instantaneous (zero-duration) occurrence at `ts`.
    ///
    /// A cookie of 0 means "no correlation": the first lane free at `ts` is
    /// reused, otherwise a new lane is created. Non-zero cookies get a
    /// dedicated lane.
    pub fn scoped(
        &mut self,
        storage: &mut TraceStorage,
        set: TrackSetId,
        ts: i64,
        cookie: i64,
    ) -> TrackId {
        if cookie != 0 {
            if let Some(lane) = Self::lane_for_cookie(&mut self.sets[set.0 as usize], cookie) {
                lane.busy_until = lane.busy_until.max(ts);
                return lane.track;
            }
            return self.new_lane(storage, set, Some(cookie), 0, ts);
        }
        let track_set = &mut self.sets[set.0 as usize];
        if let Some(lane) = track_set
            .lanes
            .iter_mut()
            .find(|l| l.cookie.is_none() && l.nest_count == 0 && l.busy_until <= ts)
        {
            lane.busy_until = ts;
            return lane.track;
        }
        self.new_lane(storage, set, None, 0, ts)
    }

    fn lane_for_cookie(set: &mut TrackSet, cookie: i64) -> Option<&mut Lane> {
        set.lanes.iter_mut().find(|l| l.cookie == Some(cookie))
    }

    fn new_lane(
        &mut self,
        storage: &mut TraceStorage,
        set: TrackSetId,
        cookie: Option<i64>,
        nest_count: u32,
        busy_until: i64,
    ) -> TrackId {
        let track_set = &mut self.sets[set.0 as usize];
        let track = storage.push_track(TrackRecord {
            name: track_set.name,
            kind: TrackKind::Async,
        });
        track_set.lanes.push(Lane {
            track,
            cookie,
            nest_count,
            busy_until,
        });
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (TraceStorage, StringId) {
        let mut storage = TraceStorage::new();
        let name = storage.intern("DeviceStateChanged");
        (storage, name)
    }

    #[test]
    fn test_intern_global_counter_track_idempotent() {
        let mut storage = TraceStorage::new();
        let mut tracker = TrackTracker::new();
        let name = storage.intern("batt.current_ua");
        let a = tracker.intern_global_counter_track(&mut storage, name);
        let b = tracker.intern_global_counter_track(&mut storage, name);
        assert_eq!(a, b);
        assert_eq!(storage.tracks().len(), 1);
        assert_eq!(storage.track(a).name, name);
    }

    #[test]
    fn test_distinct_names_distinct_tracks() {
        let mut storage = TraceStorage::new();
        let mut tracker = TrackTracker::new();
        let a_name = storage.intern("a");
        let b_name = storage.intern("b");
        let a = tracker.intern_global_counter_track(&mut storage, a_name);
        let b = tracker.intern_global_counter_track(&mut storage, b_name);
        assert_ne!(a, b);
    }

    #[test]
    fn test_track_set_interning_idempotent() {
        let (_, name) = setup();
        let mut tracker = AsyncTrackSetTracker::new();
        assert_eq!(
            tracker.intern_global_track_set(name),
            tracker.intern_global_track_set(name)
        );
    }

    #[test]
    fn test_scoped_without_cookie_reuses_free_lane() {
        let (mut storage, name) = setup();
        let mut tracker = AsyncTrackSetTracker::new();
        let set = tracker.intern_global_track_set(name);
        let a = tracker.scoped(&mut storage, set, 100, 0);
        let b = tracker.scoped(&mut storage, set, 200, 0);
        // Zero-duration events complete immediately, so the lane is free.
        assert_eq!(a, b);
        assert_eq!(storage.tracks().len(), 1);
    }

    #[test]
    fn test_scoped_distinct_cookies_distinct_lanes() {
        let (mut storage, name) = setup();
        let mut tracker = AsyncTrackSetTracker::new();
        let set = tracker.intern_global_track_set(name);
        let a = tracker.scoped(&mut storage, set, 100, 7);
        let b = tracker.scoped(&mut storage, set, 100, 8);
        assert_ne!(a, b);
        let c = tracker.scoped(&mut storage, set, 150, 7);
        assert_eq!(a, c);
    }

    #[test]
    fn test_begin_end_nesting_shares_lane() {
        let (mut storage, name) = setup();
        let mut tracker = AsyncTrackSetTracker::new();
        let set = tracker.intern_global_track_set(name);
        let a = tracker.begin(&mut storage, set, 5);
        let b = tracker.begin(&mut storage, set, 5);
        assert_eq!(a, b);
        assert_eq!(tracker.end(set, 5), Some(a));
        assert_eq!(tracker.end(set, 5), Some(a));
        // Unmatched end.
        assert_eq!(tracker.end(set, 5), None);
    }

    #[test]
    fn test_concurrent_begins_get_separate_lanes() {
        let (mut storage, name) = setup();
        let mut tracker = AsyncTrackSetTracker::new();
        let set = tracker.intern_global_track_set(name);
        let a = tracker.begin(&mut storage, set, 1);
        let b = tracker.begin(&mut storage, set, 2);
        assert_ne!(a, b);
        tracker.end(set, 1);
        // Cookie released; a new correlation claims the freed lane.
        let c = tracker.begin(&mut storage, set, 3);
        assert_eq!(a, c);
        assert_ne!(b, c);
    }
}
