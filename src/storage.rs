//! Append-only columnar storage for one ingested trace.
//!
//! `TraceStorage` owns the string interner, every output table, the flat
//! diagnostic stat map, and trace-level metadata. Rows are appended during
//! ingestion and read-only afterwards; a separate query layer consumes the
//! finished storage.

use std::collections::BTreeMap;

use crate::interner::{StringId, StringInterner};
use crate::trace::{
    CounterRecord, GameInterventionRecord, LogRecord, PackageRecord, ProcessRecord, SliceRecord,
    ThreadRecord, TrackRecord,
};
use crate::track::TrackId;

/// Diagnostic stat keys. Incremented keys count anomalies; set keys hold the
/// last known value reported by a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stat {
    PowerRailUnknownIndex,
    AndroidLogNumFailed,
    AndroidLogNumSkipped,
    AndroidLogNumTotal,
    PackagesListHasReadErrors,
    PackagesListHasParseErrors,
    GameInterventionHasReadErrors,
    GameInterventionHasParseErrors,
    UnknownPacketKind,
    ClockSnapshotUnconvertible,
}

impl Stat {
    pub fn name(self) -> &'static str {
        match self {
            Stat::PowerRailUnknownIndex => "power_rail_unknown_index",
            Stat::AndroidLogNumFailed => "android_log_num_failed",
            Stat::AndroidLogNumSkipped => "android_log_num_skipped",
            Stat::AndroidLogNumTotal => "android_log_num_total",
            Stat::PackagesListHasReadErrors => "packages_list_has_read_errors",
            Stat::PackagesListHasParseErrors => "packages_list_has_parse_errors",
            Stat::GameInterventionHasReadErrors => "game_intervention_has_read_errors",
            Stat::GameInterventionHasParseErrors => "game_intervention_has_parse_errors",
            Stat::UnknownPacketKind => "unknown_packet_kind",
            Stat::ClockSnapshotUnconvertible => "clock_snapshot_unconvertible",
        }
    }
}

/// Trace-level metadata keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetadataKey {
    StatsdTriggeringSubscriptionId,
}

impl MetadataKey {
    pub fn name(self) -> &'static str {
        match self {
            MetadataKey::StatsdTriggeringSubscriptionId => "statsd_triggering_subscription_id",
        }
    }
}

#[derive(Debug, Default)]
pub struct TraceStorage {
    interner: StringInterner,
    tracks: Vec<TrackRecord>,
    counters: Vec<CounterRecord>,
    slices: Vec<SliceRecord>,
    logs: Vec<LogRecord>,
    packages: Vec<PackageRecord>,
    game_interventions: Vec<GameInterventionRecord>,
    processes: Vec<ProcessRecord>,
    threads: Vec<ThreadRecord>,
    stats: BTreeMap<Stat, i64>,
    metadata: BTreeMap<MetadataKey, i64>,
}

impl TraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        self.interner.intern(s)
    }

    pub fn string(&self, id: StringId) -> &str {
        self.interner.get(id)
    }

    pub fn push_track(&mut self, track: TrackRecord) -> TrackId {
        let id = TrackId::from_row(self.tracks.len());
        self.tracks.push(track);
        id
    }

    pub fn push_counter(&mut self, counter: CounterRecord) {
        self.counters.push(counter);
    }

    pub fn push_slice(&mut self, slice: SliceRecord) {
        self.slices.push(slice);
    }

    pub fn push_log(&mut self, log: LogRecord) {
        self.logs.push(log);
    }

    pub fn push_package(&mut self, package: PackageRecord) {
        self.packages.push(package);
    }

    pub fn push_game_intervention(&mut self, row: GameInterventionRecord) {
        self.game_interventions.push(row);
    }

    pub(crate) fn set_identity_tables(
        &mut self,
        processes: Vec<ProcessRecord>,
        threads: Vec<ThreadRecord>,
    ) {
        self.processes = processes;
        self.threads = threads;
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> &TrackRecord {
        &self.tracks[id.row()]
    }

    pub fn counters(&self) -> &[CounterRecord] {
        &self.counters
    }

    /// Chronological view of the counter table, produced lazily at query
    /// time. Tie-break order among equal timestamps is unspecified.
    pub fn counters_sorted(&self) -> Vec<CounterRecord> {
        let mut sorted = self.counters.clone();
        sorted.sort_by_key(|c| c.ts);
        sorted
    }

    pub fn slices(&self) -> &[SliceRecord] {
        &self.slices
    }

    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    pub fn game_interventions(&self) -> &[GameInterventionRecord] {
        &self.game_interventions
    }

    pub fn processes(&self) -> &[ProcessRecord] {
        &self.processes
    }

    pub fn threads(&self) -> &[ThreadRecord] {
        &self.threads
    }

    pub fn increment_stat(&mut self, stat: Stat) {
        *self.stats.entry(stat).or_insert(0) += 1;
    }

    pub fn set_stat(&mut self, stat: Stat, value: i64) {
        self.stats.insert(stat, value);
    }

    pub fn stat(&self, stat: Stat) -> i64 {
        self.stats.get(&stat).copied().unwrap_or(0)
    }

    /// The flat diagnostic map, name -> value, in stable key order.
    pub fn stats(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
        self.stats.iter().map(|(&stat, &value)| (stat.name(), value))
    }

    pub fn set_metadata(&mut self, key: MetadataKey, value: i64) {
        self.metadata.insert(key, value);
    }

    pub fn metadata(&self, key: MetadataKey) -> Option<i64> {
        self.metadata.get(&key).copied()
    }
}
