//! Batch Scheduler: turns requested quantities for active parts into planned
//! schedule items.
//!
//! Filters each order's operations down to schedulable machines, orders active
//! parts deterministically, and walks each part's operations splitting setup and
//! production intervals at shift boundaries (the fragmentation arithmetic itself
//! lives in [`fragment`]). Persistence dedups exact-duplicate items and
//! invalidates stale ones against the [`crate::store::Store`].

pub mod fragment;

use crate::calendar;
use crate::model::*;
use crate::store::Store;
use chrono::Utc;
use log::warn;
use std::collections::HashMap;

/// Requested quantity per (part_number, production_order).
pub type QuantityRequest = HashMap<(String, String), u32>;

/// A scheduler invocation never aborts on a single part's failure: it always
/// returns the full result set it managed to plan plus a list of human-readable
/// diagnostics for anything skipped.
#[derive(Debug, Default)]
pub struct ScheduleRun {
    pub records: Vec<ScheduleRecord>,
    pub diagnostics: Vec<String>,
}

/// Runs the batch scheduler for every active part present in `requested`, against
/// the current contents of `store`, and persists the result.
///
/// `store` is only mutated after every part has been planned, so a caller never
/// observes a partially-written run.
pub fn run(store: &Store, requested: &QuantityRequest) -> ScheduleRun {
    let mut run = ScheduleRun::default();

    let mut candidates: Vec<(Order, Vec<Operation>, u32)> = Vec::new();
    for ((part_number, production_order), &quantity) in requested {
        let Some(order) = store.get_order_by_key(part_number, production_order) else {
            run.diagnostics.push(format!("no Order found for ({part_number}, {production_order}); skipping"));
            continue;
        };
        let ops = filtered_operations(store, &order);
        if ops.is_empty() {
            run.diagnostics.push(format!("{part_number}/{production_order}: no schedulable operations after filtering; skipping"));
            continue;
        }
        candidates.push((order, ops, quantity));
    }

    // Canonical order: activation_timestamp, priority, part_number, production_order
    // ascending. A part missing its activation is skipped with a diagnostic rather
    // than sorted arbitrarily.
    let mut ordered = Vec::new();
    for (order, ops, quantity) in candidates {
        match store.get_part_status(&order.production_order) {
            Some(status) if status.is_active() => ordered.push((status.activation_timestamp, order, ops, quantity)),
            _ => run.diagnostics.push(format!("{}/{}: no active PartScheduleStatus; skipping (partially_completed)", order.part_number, order.production_order)),
        }
    }
    ordered.sort_by(|a, b| (a.0, a.1.priority, a.1.part_number.clone(), a.1.production_order.clone()).cmp(&(b.0, b.1.priority, b.1.part_number.clone(), b.1.production_order.clone())));

    for (activation, order, ops, quantity) in ordered {
        let records = schedule_part(&order, &ops, quantity, activation, &mut run.diagnostics);
        persist_part(store, &order, &ops, quantity, &records);
        run.records.extend(records);
    }

    run
}

/// Drops operations whose machine isn't schedulable (sentinel machine, or a
/// work center flagged non-schedulable).
fn filtered_operations(store: &Store, order: &Order) -> Vec<Operation> {
    store
        .operations_for_order(&order.id)
        .into_iter()
        .filter(|op| store.machine_is_schedulable(&op.machine_id))
        .collect()
}

/// Schedules one part's operations in sequence, emitting one `ScheduleRecord` per
/// shift fragment. Missing operation timings fall back to defaults with a warning,
/// never aborting the run.
fn schedule_part(order: &Order, ops: &[Operation], quantity: u32, activation: chrono::DateTime<Utc>, diagnostics: &mut Vec<String>) -> Vec<ScheduleRecord> {
    let mut records = Vec::new();
    let mut cursor = calendar::adjust_to_shift(calendar::to_ist(activation));

    for op in ops {
        cursor = calendar::adjust_to_shift(cursor);

        let setup_minutes = if op.setup_time_hours > 0.0 || op.ideal_cycle_time_hours > 0.0 {
            op.setup_minutes()
        } else {
            warn!("{}/{}: operation {} missing timing, using defaults (setup=30min, cycle=5min)", order.part_number, order.production_order, op.operation_number);
            diagnostics.push(format!("{}/{}: operation {} used default timing", order.part_number, order.production_order, op.operation_number));
            DEFAULT_SETUP_MINUTES
        };
        let cycle_minutes = if op.ideal_cycle_time_hours > 0.0 { op.cycle_minutes() } else { DEFAULT_CYCLE_MINUTES };

        let (setup_fragments, after_setup) = fragment::split_setup(cursor, setup_minutes);
        for frag in &setup_fragments {
            records.push(to_record(order, op, frag));
        }

        let (production_fragments, after_production) = fragment::split_production(after_setup, quantity, cycle_minutes);
        for frag in &production_fragments {
            records.push(to_record(order, op, frag));
        }

        cursor = after_production;
    }

    records
}

fn to_record(order: &Order, op: &Operation, frag: &fragment::TimeFragment) -> ScheduleRecord {
    ScheduleRecord {
        part_number: order.part_number.clone(),
        operation_description: op.operation_description.clone(),
        machine_id: op.machine_id.clone(),
        start_time: calendar::from_ist(frag.start),
        end_time: calendar::from_ist(frag.end),
        quantity_label: frag.label.clone(),
        production_order: order.production_order.clone(),
    }
}

/// Persists a part's schedule: dedup/reuse exact-duplicate items, invalidate any
/// pre-existing item for the same (order, operation, machine, quantity) whose
/// start_time differs, and seed version 1 for new items.
fn persist_part(store: &Store, order: &Order, ops: &[Operation], quantity: u32, records: &[ScheduleRecord]) {
    for op in ops {
        let Some(first) = records.iter().find(|r| r.machine_id == op.machine_id) else { continue };
        let Some(last) = records.iter().rev().find(|r| r.machine_id == op.machine_id) else { continue };

        let existing = store.items_for_order_operation_machine(&order.id, &op.id, &op.machine_id);
        let dedup_key = ScheduleDedupKey {
            order_id: order.id.clone(),
            operation_id: op.id.clone(),
            machine_id: op.machine_id.clone(),
            total_quantity: quantity,
            initial_start_time: first.start_time,
            initial_end_time: last.end_time,
        };

        if let Some(exact) = existing.iter().find(|i| i.dedup_key() == dedup_key) {
            let _ = exact; // exact duplicate already persisted; nothing to do
            continue;
        }

        for stale in existing.iter().filter(|i| i.same_slot_different_start(&dedup_key)) {
            store.set_item_status(&stale.id, ItemStatus::Invalidated);
        }

        let item_id = store.new_schedule_item_id();
        let item = PlannedScheduleItem {
            id: item_id.clone(),
            order_id: order.id.clone(),
            operation_id: op.id.clone(),
            machine_id: op.machine_id.clone(),
            total_quantity: quantity,
            initial_start_time: first.start_time,
            initial_end_time: last.end_time,
            remaining_quantity: quantity,
            status: ItemStatus::Scheduled,
            current_version: 1,
        };
        store.put_schedule_item(item);
        store.push_version(ScheduleVersion::new_initial(item_id, first.start_time, last.end_time, quantity));
    }
}
