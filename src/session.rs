//! One trace ingestion pass.
//!
//! A session owns its context and parser exclusively; packets are handled
//! one at a time with no concurrent mutation. Multiple sessions may run in
//! parallel over different traces because nothing here is shared.

use anyhow::Result;
use log::debug;

use perfetto_protos::trace::Trace;
use perfetto_protos::trace_packet::trace_packet::Data;
use perfetto_protos::trace_packet::TracePacket;

use crate::config::IngestConfig;
use crate::context::ProbeContext;
use crate::parser::ProbesParser;
use crate::storage::{Stat, TraceStorage};

pub struct IngestSession {
    context: ProbeContext,
    parser: ProbesParser,
}

impl IngestSession {
    pub fn new(config: IngestConfig) -> Self {
        let mut context = ProbeContext::new(&config);
        let parser = ProbesParser::new(&mut context.storage, &config);
        IngestSession { context, parser }
    }

    pub fn parser_mut(&mut self) -> &mut ProbesParser {
        &mut self.parser
    }

    /// Ingest a whole decoded trace, packet by packet.
    ///
    /// Per-packet data problems are recorded as diagnostic stats and never
    /// fail the pass; only a broken upstream contract returns an error, with
    /// all previously appended rows left intact.
    pub fn ingest_trace(&mut self, trace: &Trace) -> Result<()> {
        for packet in &trace.packet {
            self.ingest_packet(packet)?;
        }
        Ok(())
    }

    pub fn ingest_packet(&mut self, packet: &TracePacket) -> Result<()> {
        let ctx = &mut self.context;
        let Some(data) = packet.data.as_ref() else {
            return Ok(());
        };

        if let Data::ClockSnapshot(snapshot) = data {
            let readings: Vec<(u32, i64)> = snapshot
                .clocks
                .iter()
                .map(|clock| (clock.clock_id(), clock.timestamp() as i64))
                .collect();
            if !ctx.clock.add_snapshot(&readings) {
                ctx.storage.increment_stat(Stat::ClockSnapshotUnconvertible);
            }
            return Ok(());
        }

        // Packet-level trace time. Log events carry their own realtime
        // timestamps and are converted per event instead.
        let clock_id = if packet.has_timestamp_clock_id() {
            packet.timestamp_clock_id()
        } else {
            ctx.clock.trace_clock()
        };
        let ts = if packet.has_timestamp() {
            ctx.clock.to_trace_time(clock_id, packet.timestamp() as i64)
        } else {
            None
        };

        match data {
            Data::Battery(evt) => {
                if let Some(ts) = ts {
                    self.parser.parse_battery_counters(ctx, ts, evt);
                } else {
                    debug!("dropping battery packet with unconvertible timestamp");
                }
            }
            Data::PowerRails(evt) => self.parser.parse_power_rails(ctx, ts, evt)?,
            Data::AndroidLog(log) => self.parser.parse_log_packet(ctx, log),
            Data::TraceConfig(config) => {
                if let Some(metadata) = config.statsd_metadata.0.as_ref() {
                    self.parser.parse_statsd_metadata(ctx, metadata);
                }
            }
            Data::PackagesList(list) => self.parser.parse_packages_list(ctx, list),
            Data::AndroidGameInterventionList(list) => {
                self.parser.parse_game_intervention_list(ctx, list)
            }
            Data::InitialDisplayState(state) => {
                if let Some(ts) = ts {
                    self.parser.parse_initial_display_state(ctx, ts, state);
                } else {
                    debug!("dropping initial display state packet with unconvertible timestamp");
                }
            }
            Data::AndroidSystemProperty(props) => {
                if let Some(ts) = ts {
                    self.parser.parse_system_property(ctx, ts, props);
                } else {
                    debug!("dropping system property packet with unconvertible timestamp");
                }
            }
            _ => ctx.storage.increment_stat(Stat::UnknownPacketKind),
        }
        Ok(())
    }

    /// Tear the session down and hand over the finished tables.
    pub fn finish(self) -> TraceStorage {
        self.context.into_storage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfetto_protos::battery_counters::BatteryCounters;
    use perfetto_protos::builtin_clock::BuiltinClock;
    use perfetto_protos::clock_snapshot::clock_snapshot::Clock;
    use perfetto_protos::clock_snapshot::ClockSnapshot;

    fn battery_packet(ts: u64, current_ua: i64) -> TracePacket {
        let mut evt = BatteryCounters::new();
        evt.set_current_ua(current_ua);
        let mut packet = TracePacket::new();
        packet.set_timestamp(ts);
        packet.data = Some(Data::Battery(evt));
        packet
    }

    fn snapshot_packet(readings: &[(u32, u64)]) -> TracePacket {
        let mut snapshot = ClockSnapshot::new();
        for &(clock_id, ts) in readings {
            let mut clock = Clock::new();
            clock.set_clock_id(clock_id);
            clock.set_timestamp(ts);
            snapshot.clocks.push(clock);
        }
        let mut packet = TracePacket::new();
        packet.data = Some(Data::ClockSnapshot(snapshot));
        packet
    }

    #[test]
    fn test_trace_clock_packet_needs_no_snapshot() {
        let mut session = IngestSession::new(IngestConfig::default());
        session.ingest_packet(&battery_packet(100, 25000)).unwrap();
        let storage = session.finish();
        assert_eq!(storage.counters().len(), 1);
        assert_eq!(storage.counters()[0].ts, 100);
    }

    #[test]
    fn test_foreign_clock_packet_dropped_until_snapshot() {
        let monotonic = BuiltinClock::BUILTIN_CLOCK_MONOTONIC as u32;
        let mut session = IngestSession::new(IngestConfig::default());

        let mut early = battery_packet(500, 1);
        early.set_timestamp_clock_id(monotonic);
        session.ingest_packet(&early).unwrap();

        let boottime = BuiltinClock::BUILTIN_CLOCK_BOOTTIME as u32;
        session
            .ingest_packet(&snapshot_packet(&[(boottime, 1000), (monotonic, 400)]))
            .unwrap();

        let mut late = battery_packet(600, 2);
        late.set_timestamp_clock_id(monotonic);
        session.ingest_packet(&late).unwrap();

        let storage = session.finish();
        // The pre-snapshot sample is dropped, not stored with a sentinel.
        assert_eq!(storage.counters().len(), 1);
        assert_eq!(storage.counters()[0].ts, 1200);
        assert_eq!(storage.counters()[0].value, 2.0);
    }

    #[test]
    fn test_unhandled_packet_kind_counted() {
        use perfetto_protos::system_info::SystemInfo;
        let mut session = IngestSession::new(IngestConfig::default());
        let mut packet = TracePacket::new();
        packet.set_timestamp(10);
        packet.data = Some(Data::SystemInfo(SystemInfo::new()));
        session.ingest_packet(&packet).unwrap();
        let storage = session.finish();
        assert_eq!(storage.stat(Stat::UnknownPacketKind), 1);
    }

    #[test]
    fn test_empty_packet_ignored() {
        let mut session = IngestSession::new(IngestConfig::default());
        session.ingest_packet(&TracePacket::new()).unwrap();
        let storage = session.finish();
        assert!(storage.counters().is_empty());
        let flat: Vec<(&str, i64)> = storage.stats().collect();
        assert!(flat.iter().all(|&(_, v)| v == 0));
    }
}
