//! Row structs for the tables produced by an ingestion session.
//!
//! All rows are append-only: once a record lands in [`crate::TraceStorage`]
//! it is never mutated or deleted by this crate. Strings are referenced by
//! [`StringId`], thread identities by [`UniqueTid`], timelines by
//! [`TrackId`].

use crate::interner::StringId;
use crate::process::{UniquePid, UniqueTid};
use crate::track::TrackId;

/// What a track carries; counter tracks hold samples, async tracks hold
/// slice lanes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackKind {
    #[default]
    Counter,
    Async,
}

/// A named timeline. One row per [`TrackId`], in id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackRecord {
    pub name: StringId,
    pub kind: TrackKind,
}

/// One counter sample.
///
/// Rows are appended in arrival order; chronological order is produced at
/// query time, not at insert time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CounterRecord {
    pub ts: i64,
    pub track: TrackId,
    pub value: f64,
}

/// A closed timed interval on a track. `dur == 0` marks an instantaneous
/// event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SliceRecord {
    pub ts: i64,
    pub dur: i64,
    pub track: TrackId,
    pub name: StringId,
    pub category: StringId,
    pub depth: u32,
}

/// One log event. `utid` is the null identity when the event carried no
/// thread context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub ts: i64,
    pub utid: UniqueTid,
    pub prio: u8,
    pub tag: StringId,
    pub msg: StringId,
}

/// One installed package. Unique per package name within one trace; the
/// first occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: StringId,
    pub uid: i64,
    pub debuggable: bool,
    pub profileable_from_shell: bool,
    pub version_code: i64,
}

/// Per-mode columns of a game intervention row. `active` says whether the
/// mode was reported at all; the optionals are absent when it was not.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameModeColumns {
    pub active: bool,
    pub downscale: Option<f64>,
    pub angle: Option<bool>,
    pub fps: Option<f64>,
}

/// One game package's intervention settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameInterventionRecord {
    pub name: StringId,
    pub uid: i64,
    pub current_mode: i32,
    pub standard: GameModeColumns,
    pub performance: GameModeColumns,
    pub battery: GameModeColumns,
}

/// Logical process identity row. Row 0 is the reserved null identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessRecord {
    pub upid: UniquePid,
    pub pid: i32,
    pub name: Option<StringId>,
}

/// Logical thread identity row. Row 0 is the reserved null identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadRecord {
    pub utid: UniqueTid,
    pub tid: i32,
    pub upid: Option<UniquePid>,
    pub name: Option<StringId>,
}
