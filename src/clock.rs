//! Multi-domain timestamp normalization.
//!
//! Trace packets declare timestamps in different clock domains (boottime,
//! realtime, monotonic, ...). Periodic clock snapshot packets carry
//! simultaneous readings across domains; this tracker turns those into
//! synchronization points and converts raw timestamps into the single trace
//! time domain.
//!
//! Conversion always uses the most recent synchronization point at or before
//! the raw timestamp, never a future one, so a single forward pass over the
//! trace stays causally consistent.

use std::collections::HashMap;

use perfetto_protos::builtin_clock::BuiltinClock;

/// The default trace time domain.
pub fn default_trace_clock() -> u32 {
    BuiltinClock::BUILTIN_CLOCK_BOOTTIME as u32
}

#[derive(Clone, Copy, Debug)]
struct SyncPoint {
    raw: i64,
    trace_ts: i64,
}

#[derive(Debug)]
pub struct ClockTracker {
    trace_clock: u32,
    // Per clock domain, synchronization points ordered by raw timestamp.
    sync: HashMap<u32, Vec<SyncPoint>>,
}

impl ClockTracker {
    pub fn new(trace_clock: u32) -> Self {
        ClockTracker {
            trace_clock,
            sync: HashMap::new(),
        }
    }

    pub fn trace_clock(&self) -> u32 {
        self.trace_clock
    }

    /// Ingest one snapshot of simultaneous readings across clock domains.
    ///
    /// If the snapshot contains the trace clock its reading anchors the rest
    /// directly. Otherwise any domain that is already convertible serves as
    /// the reference hop. Returns false when no reading in the snapshot can
    /// be anchored to trace time; the caller records the anomaly.
    pub fn add_snapshot(&mut self, readings: &[(u32, i64)]) -> bool {
        let anchor = readings
            .iter()
            .find(|&&(id, _)| id == self.trace_clock)
            .map(|&(_, ts)| ts)
            .or_else(|| {
                readings
                    .iter()
                    .find_map(|&(id, ts)| self.to_trace_time(id, ts))
            });
        let Some(anchor_ts) = anchor else {
            return false;
        };
        for &(id, raw) in readings {
            if id == self.trace_clock {
                continue;
            }
            self.insert_sync_point(id, raw, anchor_ts);
        }
        true
    }

    /// Convert a raw timestamp in `clock` to trace time.
    ///
    /// Returns None when no synchronization point at or before `raw` is
    /// known yet. Callers must drop the event, not substitute a sentinel.
    pub fn to_trace_time(&self, clock: u32, raw: i64) -> Option<i64> {
        if clock == self.trace_clock {
            return Some(raw);
        }
        let points = self.sync.get(&clock)?;
        let pos = points.partition_point(|p| p.raw <= raw);
        if pos == 0 {
            return None;
        }
        let point = &points[pos - 1];
        Some(point.trace_ts + (raw - point.raw))
    }

    fn insert_sync_point(&mut self, clock: u32, raw: i64, trace_ts: i64) {
        let points = self.sync.entry(clock).or_default();
        // Snapshots can arrive out of order; keep the list sorted.
        let pos = points.partition_point(|p| p.raw <= raw);
        points.insert(pos, SyncPoint { raw, trace_ts });
    }
}

impl Default for ClockTracker {
    fn default() -> Self {
        Self::new(default_trace_clock())
    }
}
