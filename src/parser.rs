//! Probe packet handlers.
//!
//! Each handler takes decoded packet fields (presence-checked by the
//! `perfetto_protos` layer) and drives the trackers to append rows. A bad
//! field in one packet records a diagnostic stat and drops that sample;
//! only a broken upstream contract aborts the whole trace.

use std::collections::HashMap;

use anyhow::{ensure, Result};

use perfetto_protos::android_game_intervention_list::AndroidGameInterventionList;
use perfetto_protos::android_log::android_log_packet::log_event::Arg;
use perfetto_protos::android_log::android_log_packet::{LogEvent, Stats};
use perfetto_protos::android_log::AndroidLogPacket;
use perfetto_protos::android_log_constants::AndroidLogPriority;
use perfetto_protos::android_system_property::AndroidSystemProperty;
use perfetto_protos::battery_counters::BatteryCounters;
use perfetto_protos::builtin_clock::BuiltinClock;
use perfetto_protos::initial_display_state::InitialDisplayState;
use perfetto_protos::packages_list::PackagesList;
use perfetto_protos::power_rails::PowerRails;
use perfetto_protos::trace_config::trace_config::StatsdMetadata;

use crate::config::IngestConfig;
use crate::context::ProbeContext;
use crate::interner::StringId;
use crate::process::UniqueTid;
use crate::storage::{MetadataKey, Stat, TraceStorage};
use crate::trace::{GameInterventionRecord, GameModeColumns, LogRecord, PackageRecord};
use crate::utils::BoundedBuf;

const GAME_MODE_STANDARD: u32 = 1;
const GAME_MODE_PERFORMANCE: u32 = 2;
const GAME_MODE_BATTERY: u32 = 3;

/// Where a recognized system property routes its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyRoute {
    /// Integer-parsed value pushed to the screen-state counter track.
    ScreenStateCounter,
    /// Value recorded as an instantaneous event on a device-state lane.
    DeviceStateSlice,
}

pub struct ProbesParser {
    batt_charge_id: StringId,
    batt_capacity_id: StringId,
    batt_current_id: StringId,
    batt_current_avg_id: StringId,
    screen_state_id: StringId,
    device_state_id: StringId,
    // Property-name routing; unregistered names deliberately produce no
    // output.
    property_routes: HashMap<String, PropertyRoute>,
    log_message_cap: usize,
}

impl ProbesParser {
    pub fn new(storage: &mut TraceStorage, config: &IngestConfig) -> Self {
        let mut property_routes = HashMap::new();
        property_routes.insert(
            "debug.tracing.screen_state".to_string(),
            PropertyRoute::ScreenStateCounter,
        );
        property_routes.insert(
            "debug.tracing.device_state".to_string(),
            PropertyRoute::DeviceStateSlice,
        );
        ProbesParser {
            batt_charge_id: storage.intern("batt.charge_uah"),
            batt_capacity_id: storage.intern("batt.capacity_pct"),
            batt_current_id: storage.intern("batt.current_ua"),
            batt_current_avg_id: storage.intern("batt.current.avg_ua"),
            screen_state_id: storage.intern("ScreenState"),
            device_state_id: storage.intern("DeviceStateChanged"),
            property_routes,
            log_message_cap: config.log_message_cap,
        }
    }

    /// Extension point for additional property mappings.
    pub fn register_property(&mut self, name: String, route: PropertyRoute) {
        self.property_routes.insert(name, route);
    }

    pub fn parse_battery_counters(&self, ctx: &mut ProbeContext, ts: i64, evt: &BatteryCounters) {
        if evt.has_charge_counter_uah() {
            let track = ctx
                .tracks
                .intern_global_counter_track(&mut ctx.storage, self.batt_charge_id);
            ctx.events
                .push_counter(&mut ctx.storage, ts, evt.charge_counter_uah() as f64, track);
        }
        if evt.has_capacity_percent() {
            let track = ctx
                .tracks
                .intern_global_counter_track(&mut ctx.storage, self.batt_capacity_id);
            ctx.events
                .push_counter(&mut ctx.storage, ts, evt.capacity_percent() as f64, track);
        }
        if evt.has_current_ua() {
            let track = ctx
                .tracks
                .intern_global_counter_track(&mut ctx.storage, self.batt_current_id);
            ctx.events
                .push_counter(&mut ctx.storage, ts, evt.current_ua() as f64, track);
        }
        if evt.has_current_avg_ua() {
            let track = ctx
                .tracks
                .intern_global_counter_track(&mut ctx.storage, self.batt_current_avg_id);
            ctx.events
                .push_counter(&mut ctx.storage, ts, evt.current_avg_ua() as f64, track);
        }
    }

    /// Handle one power rails packet.
    ///
    /// Rail descriptors establish the index -> track mapping; a packet that
    /// only carries descriptors is complete at that point. Sample packets
    /// must carry exactly one energy-data entry (upstream contract; anything
    /// else is a fatal invariant violation, not bad input). `ts` is None
    /// when the packet timestamp had no clock path yet; the sample is then
    /// dropped while descriptors still register.
    pub fn parse_power_rails(
        &self,
        ctx: &mut ProbeContext,
        ts: Option<i64>,
        evt: &PowerRails,
    ) -> Result<()> {
        for desc in &evt.rail_descriptor {
            if !desc.has_index() || !desc.has_rail_name() {
                continue;
            }
            let name = format!("power.{}_uws", desc.rail_name());
            let name_id = ctx.storage.intern(&name);
            let track = ctx
                .tracks
                .intern_global_counter_track(&mut ctx.storage, name_id);
            ctx.probes.set_power_rail_track(desc.index(), track);
        }

        if evt.energy_data.is_empty() {
            ensure!(
                !evt.rail_descriptor.is_empty(),
                "power rails packet carries neither descriptors nor energy data"
            );
            return Ok(());
        }
        ensure!(
            evt.energy_data.len() == 1,
            "power rails packet carries {} energy data entries, expected exactly one",
            evt.energy_data.len()
        );

        let data = &evt.energy_data[0];
        match ctx.probes.power_rail_track(data.index()) {
            Some(track) => {
                if let Some(ts) = ts {
                    ctx.events
                        .push_counter(&mut ctx.storage, ts, data.energy() as f64, track);
                }
            }
            None => ctx.storage.increment_stat(Stat::PowerRailUnknownIndex),
        }
        Ok(())
    }

    pub fn parse_log_packet(&self, ctx: &mut ProbeContext, packet: &AndroidLogPacket) {
        for evt in &packet.events {
            self.parse_log_event(ctx, evt);
        }
        if let Some(stats) = packet.stats.0.as_ref() {
            self.parse_log_stats(ctx, stats);
        }
    }

    fn parse_log_event(&self, ctx: &mut ProbeContext, evt: &LogEvent) {
        let ts = evt.timestamp() as i64;
        let pid = evt.pid();
        let tid = evt.tid();
        let tag_id = ctx.storage.intern(if evt.has_tag() { evt.tag() } else { "" });
        let mut msg_id = ctx
            .storage
            .intern(if evt.has_message() { evt.message() } else { "" });

        let mut args = BoundedBuf::new(self.log_message_cap);
        for arg in &evt.args {
            Self::format_log_arg(&mut args, arg);
        }

        let mut prio = evt.prio.map(|p| p.value()).unwrap_or(0);
        if prio == 0 {
            prio = AndroidLogPriority::PRIO_INFO as i32;
        }

        if !args.is_empty() {
            // Strip the leading separator: " foo=1 bar=2" -> "foo=1 bar=2".
            msg_id = ctx.storage.intern(&args.as_str()[1..]);
        }

        let utid = if tid != 0 {
            ctx.process.update_thread(tid, pid)
        } else {
            UniqueTid::NULL
        };

        let realtime = BuiltinClock::BUILTIN_CLOCK_REALTIME as u32;
        let Some(trace_ts) = ctx.clock.to_trace_time(realtime, ts) else {
            // Possibly a legitimate pre-synchronization event; skip without
            // recording an anomaly.
            return;
        };

        // Log rows are not required to be sorted by trace time; the query
        // layer sorts on demand.
        ctx.storage.push_log(LogRecord {
            ts: trace_ts,
            utid,
            prio: prio as u8,
            tag: tag_id,
            msg: msg_id,
        });
    }

    fn format_log_arg(args: &mut BoundedBuf, arg: &Arg) {
        if !arg.has_name() {
            return;
        }
        args.push_fragment(&format!(" {}=", arg.name()));
        if arg.has_string_value() {
            args.push_fragment(&format!("\"{}\"", arg.string_value()));
        } else if arg.has_int_value() {
            args.push_fragment(&arg.int_value().to_string());
        } else if arg.has_float_value() {
            args.push_fragment(&arg.float_value().to_string());
        }
    }

    fn parse_log_stats(&self, ctx: &mut ProbeContext, stats: &Stats) {
        if stats.has_num_failed() {
            ctx.storage
                .set_stat(Stat::AndroidLogNumFailed, stats.num_failed() as i64);
        }
        if stats.has_num_skipped() {
            ctx.storage
                .set_stat(Stat::AndroidLogNumSkipped, stats.num_skipped() as i64);
        }
        if stats.has_num_total() {
            ctx.storage
                .set_stat(Stat::AndroidLogNumTotal, stats.num_total() as i64);
        }
    }

    pub fn parse_statsd_metadata(&self, ctx: &mut ProbeContext, metadata: &StatsdMetadata) {
        if metadata.has_triggering_subscription_id() {
            ctx.storage.set_metadata(
                MetadataKey::StatsdTriggeringSubscriptionId,
                metadata.triggering_subscription_id(),
            );
        }
    }

    pub fn parse_packages_list(&self, ctx: &mut ProbeContext, list: &PackagesList) {
        ctx.storage
            .set_stat(Stat::PackagesListHasReadErrors, list.read_error() as i64);
        ctx.storage
            .set_stat(Stat::PackagesListHasParseErrors, list.parse_error() as i64);

        for pkg in &list.packages {
            let name = pkg.name();
            if !ctx.probes.should_insert_package(name) {
                continue;
            }
            let name_id = ctx.storage.intern(name);
            ctx.storage.push_package(PackageRecord {
                name: name_id,
                uid: pkg.uid() as i64,
                debuggable: pkg.debuggable(),
                profileable_from_shell: pkg.profileable_from_shell(),
                version_code: pkg.version_code(),
            });
            ctx.probes.inserted_package(name.to_string());
        }
    }

    pub fn parse_game_intervention_list(
        &self,
        ctx: &mut ProbeContext,
        list: &AndroidGameInterventionList,
    ) {
        ctx.storage
            .set_stat(Stat::GameInterventionHasReadErrors, list.read_error() as i64);
        ctx.storage.set_stat(
            Stat::GameInterventionHasParseErrors,
            list.parse_error() as i64,
        );

        for pkg in &list.game_packages {
            let mut standard = GameModeColumns::default();
            let mut performance = GameModeColumns::default();
            let mut battery = GameModeColumns::default();

            for mode in &pkg.game_mode_info {
                let columns = match mode.mode() {
                    GAME_MODE_STANDARD => &mut standard,
                    GAME_MODE_PERFORMANCE => &mut performance,
                    GAME_MODE_BATTERY => &mut battery,
                    // Unrecognized mode codes are ignored without error.
                    _ => continue,
                };
                columns.active = true;
                columns.downscale = Some(mode.resolution_downscale() as f64);
                columns.angle = Some(mode.use_angle());
                columns.fps = Some(mode.fps() as f64);
            }

            let name_id = ctx.storage.intern(pkg.name());
            ctx.storage.push_game_intervention(GameInterventionRecord {
                name: name_id,
                uid: pkg.uid() as i64,
                current_mode: pkg.current_mode() as i32,
                standard,
                performance,
                battery,
            });
        }
    }

    pub fn parse_initial_display_state(
        &self,
        ctx: &mut ProbeContext,
        ts: i64,
        state: &InitialDisplayState,
    ) {
        let track = ctx
            .tracks
            .intern_global_counter_track(&mut ctx.storage, self.screen_state_id);
        ctx.events
            .push_counter(&mut ctx.storage, ts, state.display_state() as f64, track);
    }

    pub fn parse_system_property(
        &self,
        ctx: &mut ProbeContext,
        ts: i64,
        props: &AndroidSystemProperty,
    ) {
        for kv in &props.values {
            let Some(route) = self.property_routes.get(kv.name()) else {
                continue;
            };
            match route {
                PropertyRoute::ScreenStateCounter => {
                    if let Ok(state) = kv.value().parse::<i32>() {
                        let track = ctx
                            .tracks
                            .intern_global_counter_track(&mut ctx.storage, self.screen_state_id);
                        ctx.events
                            .push_counter(&mut ctx.storage, ts, state as f64, track);
                    }
                }
                PropertyRoute::DeviceStateSlice => {
                    let state_id = ctx.storage.intern(kv.value());
                    let set = ctx.async_tracks.intern_global_track_set(self.device_state_id);
                    let track = ctx.async_tracks.scoped(&mut ctx.storage, set, ts, 0);
                    ctx.slices
                        .scoped(&mut ctx.storage, ts, track, StringId::NULL, state_id, 0);
                }
            }
        }
    }
}
