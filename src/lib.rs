//! probedb - trace ingestion core.
//!
//! Turns a stream of decoded Perfetto Android probe packets (battery, power
//! rails, logs, packages, game interventions, display state, system
//! properties) into an append-only, queryable set of relational tables.
//!
//! # Modules
//!
//! - [`interner`] - byte-string deduplication into dense [`StringId`]s
//! - [`clock`] - multi-domain timestamp normalization into trace time
//! - [`process`] - logical process/thread identity, tolerant of OS id reuse
//! - [`track`] - counter track and async track-set interning
//! - [`event`] / [`slice`] - counter sample and slice recording
//! - [`probes`] - per-trace auxiliary state (power rails, package dedup)
//! - [`parser`] - per-packet-kind handlers
//! - [`session`] - the sequential ingestion pass over one trace
//! - [`storage`] - the finished tables, stats, and metadata
//!
//! # Example
//!
//! ```no_run
//! use probedb::{IngestConfig, IngestSession};
//! use perfetto_protos::trace::Trace;
//! use protobuf::Message;
//!
//! let bytes = std::fs::read("trace.pb").unwrap();
//! let trace = Trace::parse_from_bytes(&bytes).unwrap();
//! let mut session = IngestSession::new(IngestConfig::default());
//! session.ingest_trace(&trace).unwrap();
//! let storage = session.finish();
//! println!("{} counter samples", storage.counters().len());
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod event;
pub mod interner;
pub mod parser;
pub mod probes;
pub mod process;
pub mod session;
pub mod slice;
pub mod storage;
pub mod trace;
pub mod track;
pub mod utils;

// Re-export for convenience
pub use config::IngestConfig;
pub use interner::StringId;
pub use process::{UniquePid, UniqueTid};
pub use session::IngestSession;
pub use storage::{MetadataKey, Stat, TraceStorage};
pub use track::TrackId;
