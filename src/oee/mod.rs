//! Shift Summary & OEE engine: re-derives availability, performance, and
//! quality for a machine's current shift from its raw status history and
//! production logs. Exactly one writer touches `ShiftSummary`: collectors
//! only ever call [`update`].

use crate::calendar::{self, ShiftTable};
use crate::model::{MachineId, Status};
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};

/// Toggles a legacy quality-counting behavior kept only for parity with older
/// reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct OeeConfig {
    /// When true, `good_parts` is forced to `total_parts` whenever the engine
    /// observes `Status::Production` at the end of a shift. Default `false`,
    /// since this double-counts scrap logged against a still-running machine.
    pub legacy_quality: bool,
}

/// Re-derives the `ShiftSummary` covering `now` for `machine_id` from the
/// `MachineRaw` history and the `ProductionLog` aggregate. Idempotent:
/// replaying the same `now` twice produces the same row.
pub fn update(store: &Store, now: DateTime<Utc>, machine_id: &MachineId) {
    update_with_config(store, now, machine_id, &ShiftTable::three_shift_default(), &OeeConfig::default());
}

pub fn update_with_config(store: &Store, now: DateTime<Utc>, machine_id: &MachineId, shifts: &ShiftTable, config: &OeeConfig) {
    let now_ist = calendar::to_ist(now);
    let Some((shift_id, shift_start_ist, shift_end_ist)) = shifts.shift_covering(now_ist) else { return };
    let shift_start = calendar::from_ist(shift_start_ist);
    let shift_end = calendar::from_ist(shift_end_ist);
    let shift_length = shift_end - shift_start;

    let mut summary = store.get_shift_summary(machine_id, &shift_id, shift_start).unwrap_or_else(|| crate::model::ShiftSummary::new_zero(machine_id.clone(), &shift_id, shift_start, shift_end));

    // Step 3: replay MachineRaw from the transition in effect at shift_start up to
    // `now`, accumulating by the status in effect at the *start* of each segment.
    let rows = store.raw_in_window(machine_id, shift_start, now.min(shift_end));
    let mut off = Duration::zero();
    let mut idle = Duration::zero();
    let mut production = Duration::zero();

    let window_end = now.min(shift_end);
    for window in rows.windows(2) {
        accumulate(&window[0], window[1].timestamp.min(window_end), &mut off, &mut idle, &mut production);
    }
    if let Some(last) = rows.last() {
        accumulate(last, window_end, &mut off, &mut idle, &mut production);
    }

    // Step 4: clamp each accumulator at shift_length.
    off = off.min(shift_length).max(Duration::zero());
    idle = idle.min(shift_length).max(Duration::zero());
    production = production.min(shift_length).max(Duration::zero());

    summary.off_time = off;
    summary.idle_time = idle;
    summary.production_time = production;

    let logs = store.logs_for_machine_in_window(machine_id, shift_start, shift_end);
    let mut total_parts: u64 = 0;
    let mut good_parts: u64 = 0;
    for log in &logs {
        total_parts += log.quantity_completed as u64;
        good_parts += log.quantity_completed.saturating_sub(log.quantity_rejected) as u64;
    }
    let bad_parts = total_parts.saturating_sub(good_parts);

    if config.legacy_quality {
        if let Some(live) = store.get_live(machine_id) {
            if live.status == Status::Production && now >= shift_end {
                good_parts = total_parts;
            }
        }
    }

    summary.total_parts = total_parts;
    summary.good_parts = good_parts;
    summary.bad_parts = bad_parts;

    let config_info = store.get_config_info(machine_id);
    let available_minutes = config_info.map(|c| c.available_minutes(shift_length)).unwrap_or_else(|| shift_length.num_minutes() as f64);

    summary.availability = if available_minutes > 0.0 { (production.num_seconds() as f64 / 60.0 / available_minutes).clamp(0.0, 1.0) } else { 0.0 };

    summary.performance = performance_for_shift(store, machine_id, &logs);

    summary.quality = if total_parts == 0 { 1.0 } else { good_parts as f64 / total_parts as f64 };

    summary.oee = summary.availability * summary.performance * summary.quality;

    store.put_shift_summary(summary);
}

fn accumulate(row: &crate::model::MachineRaw, segment_end: DateTime<Utc>, off: &mut Duration, idle: &mut Duration, production: &mut Duration) {
    if segment_end <= row.timestamp {
        return;
    }
    let span = segment_end - row.timestamp;
    match row.status {
        Status::Off => *off = *off + span,
        Status::Idle => *idle = *idle + span,
        Status::Production => *production = *production + span,
    }
}

/// performance = min(1, ideal_cycle_time_sec * parts_logged / operating_time_sec)
/// per operation, averaged across the operations logged in this shift.
/// `operating_time_sec` for an operation is the sum of that operation's own
/// closed logs' `(end_time - start_time)` spans, not the shift's length —
/// an operation whose logs don't span the full shift must not be penalized
/// (or flattered) by time it wasn't actually running. Cycle time is
/// canonicalized to SECONDS at this boundary only.
fn performance_for_shift(store: &Store, machine_id: &MachineId, logs: &[crate::model::ProductionLog]) -> f64 {
    use std::collections::HashMap;

    #[derive(Default)]
    struct OpAccum {
        quantity: u64,
        duration_seconds: f64,
    }

    let mut per_op: HashMap<crate::model::OperationId, OpAccum> = HashMap::new();
    for log in logs {
        let Some(end_time) = log.end_time else { continue };
        let accum = per_op.entry(log.operation_id.clone()).or_default();
        accum.quantity += log.quantity_completed as u64;
        accum.duration_seconds += (end_time - log.start_time).num_seconds() as f64;
    }
    if per_op.is_empty() {
        return 0.0;
    }

    let mut ratios = Vec::new();
    for (operation_id, accum) in per_op {
        if accum.duration_seconds <= 0.0 {
            continue;
        }
        let Some(op) = store.get_operation(&operation_id) else { continue };
        if op.machine_id != *machine_id {
            continue;
        }
        let ratio = (op.cycle_seconds() * accum.quantity as f64) / accum.duration_seconds;
        ratios.push(ratio.min(1.0));
    }
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::TimeZone;

    #[test]
    fn idempotent_replay_produces_same_summary() {
        let store = Store::new();
        let machine_id = MachineId::new("m-1");
        let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 0, 30, 0).unwrap(); // 06:00 IST
        store.append_raw(MachineRaw { machine_id: machine_id.clone(), status: Status::Production, op_mode: None, selected_program: None, active_program: None, part_count: 0, timestamp: t0 });

        let now = t0 + Duration::hours(2);
        update(&store, now, &machine_id);
        let first = store.get_shift_summary(&machine_id, "shift_1", t0).expect("summary written");
        update(&store, now, &machine_id);
        let second = store.get_shift_summary(&machine_id, "shift_1", t0).expect("summary written");

        assert_eq!(first.production_time, second.production_time);
        assert_eq!(first.oee, second.oee);
    }

    #[test]
    fn quality_with_no_parts_defaults_to_one() {
        let store = Store::new();
        let machine_id = MachineId::new("m-1");
        let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 0, 30, 0).unwrap();
        update(&store, t0 + Duration::minutes(10), &machine_id);
        let summary = store.get_shift_summary(&machine_id, "shift_1", t0).expect("summary written");
        assert_eq!(summary.quality, 1.0);
    }
}
