//! Nested slice recording.
//!
//! Keeps one open-slice stack per track. `begin` pushes, `end` closes the
//! matching open slice into a row, `scoped` records an already-closed
//! interval (zero duration for instantaneous events) without a matching end
//! call. Unmatched ends are ignored; unmatched begins stay open and produce
//! no row.

use std::collections::HashMap;

use crate::interner::StringId;
use crate::storage::TraceStorage;
use crate::trace::SliceRecord;
use crate::track::TrackId;

#[derive(Debug)]
struct OpenSlice {
    ts: i64,
    category: StringId,
    name: StringId,
    depth: u32,
}

#[derive(Debug, Default)]
pub struct SliceTracker {
    open: HashMap<TrackId, Vec<OpenSlice>>,
}

impl SliceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slice on `track` at `ts`.
    pub fn begin(&mut self, ts: i64, track: TrackId, category: StringId, name: StringId) {
        let stack = self.open.entry(track).or_default();
        let depth = stack.len() as u32;
        stack.push(OpenSlice {
            ts,
            category,
            name,
            depth,
        });
    }

    /// Close the most recent open slice on `track`, matching by name when
    /// one is given. Returns false when there is nothing to close.
    pub fn end(
        &mut self,
        storage: &mut TraceStorage,
        ts: i64,
        track: TrackId,
        name: Option<StringId>,
    ) -> bool {
        let Some(stack) = self.open.get_mut(&track) else {
            return false;
        };
        let idx = match name {
            Some(name) => stack.iter().rposition(|s| s.name == name),
            None => stack.len().checked_sub(1),
        };
        let Some(idx) = idx else {
            return false;
        };
        let open = stack.remove(idx);
        storage.push_slice(SliceRecord {
            ts: open.ts,
            dur: ts - open.ts,
            track,
            name: open.name,
            category: open.category,
            depth: open.depth,
        });
        true
    }

    /// Record an instantaneous or fixed-duration slice without an end call.
    pub fn scoped(
        &mut self,
        storage: &mut TraceStorage,
        ts: i64,
        track: TrackId,
        category: StringId,
        name: StringId,
        dur: i64,
    ) {
        let depth = self.open.get(&track).map(|s| s.len()).unwrap_or(0) as u32;
        storage.push_slice(SliceRecord {
            ts,
            dur,
            track,
            name,
            category,
            depth,
        });
    }
}
