//! Dynamic Rescheduler: re-derives schedule versions for items with new
//! production logs, splits the remainder across shift boundaries, and
//! cascades the resulting shift downstream to later operations of the same
//! order, gated by each downstream machine's live availability.

use crate::calendar;
use crate::model::*;
use crate::scheduler::fragment;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct RescheduleRun {
    pub updated_items: Vec<ScheduleItemId>,
    pub diagnostics: Vec<String>,
}

/// Re-derives schedule versions for every item whose part has at least one
/// production log attached, then cascades the change downstream. Executed as a
/// single logical transaction against `store`.
pub fn run(store: &Store, order_id: &OrderId) -> RescheduleRun {
    let mut run = RescheduleRun::default();
    let items = store.items_for_order(order_id);
    if items.is_empty() {
        return run;
    }

    // Step 1: group by (machine, operation_number, part_number).
    let Some(order) = store.get_order(order_id) else { return run };
    let mut groups: HashMap<(MachineId, u32), Vec<PlannedScheduleItem>> = HashMap::new();
    for item in items {
        let Some(op) = store.get_operation(&item.operation_id) else { continue };
        let logs = collect_logs(store, &item, &op);
        if logs.is_empty() {
            continue;
        }
        groups.entry((item.machine_id.clone(), op.operation_number)).or_default().push(item);
    }

    let mut seen: HashMap<(String, u32, DateTime<Utc>), u32> = HashMap::new();

    for ((machine_id, operation_number), mut group_items) in groups {
        // Step 2: newest item (max id, using the surrogate id's lexical order as a
        // stand-in for an auto-increment primary key) and its active version.
        group_items.sort_by(|a, b| a.id.value.cmp(&b.id.value));
        let Some(item) = group_items.last().cloned() else { continue };
        let Some(op) = store.get_operation(&item.operation_id) else { continue };
        let Some(active) = store.active_version(&item.id) else { continue };

        let logs = collect_logs(store, &item, &op);
        if logs.is_empty() {
            continue;
        }

        let actual_completed_qty: u32 = logs.iter().map(|l| l.quantity_completed).sum::<u32>().min(item.total_quantity);
        let remaining_qty = item.total_quantity.saturating_sub(actual_completed_qty);
        let group_start = logs.iter().map(|l| l.start_time).min().expect("non-empty logs");
        let group_end = logs.iter().filter_map(|l| l.end_time).max().expect("non-empty logs checked via is_closed_and_counted");

        let mut cascade_start = group_end;

        if actual_completed_qty > 0 {
            let new_version = ScheduleVersion {
                item_id: item.id.clone(),
                version_number: active.version_number + 1,
                planned_start_time: group_start,
                planned_end_time: group_end,
                planned_quantity: actual_completed_qty,
                completed_quantity: actual_completed_qty,
                remaining_quantity: 0,
                is_active: true,
            };
            let dedup = (order.part_number.clone(), operation_number, group_start);
            if seen.get(&dedup).map(|v| *v < new_version.version_number).unwrap_or(true) {
                seen.insert(dedup, new_version.version_number);
                store.push_version(new_version);
                store.set_item_status(&item.id, if remaining_qty == 0 { ItemStatus::Completed } else { ItemStatus::Scheduled });
                run.updated_items.push(item.id.clone());
            }
        }

        if remaining_qty > 0 {
            let remainder_start = calendar::adjust_to_shift(calendar::to_ist(group_end));
            let (setup_fragments, after_setup) = fragment::split_setup(remainder_start, op.setup_minutes());
            let (production_fragments, after_production) = fragment::split_production(after_setup, remaining_qty, op.cycle_minutes());
            let remainder_end = if !production_fragments.is_empty() { after_production } else if !setup_fragments.is_empty() { after_setup } else { remainder_start };

            let new_version = ScheduleVersion {
                item_id: item.id.clone(),
                version_number: store.active_version(&item.id).map(|v| v.version_number + 1).unwrap_or(active.version_number + 1),
                planned_start_time: calendar::from_ist(remainder_start),
                planned_end_time: calendar::from_ist(remainder_end),
                planned_quantity: remaining_qty,
                completed_quantity: 0,
                remaining_quantity: remaining_qty,
                is_active: true,
            };
            store.push_version(new_version);
            cascade_start = calendar::from_ist(remainder_end);
            run.updated_items.push(item.id.clone());
        }

        cascade_downstream(store, &order, &op, cascade_start, &mut seen, &mut run);
    }

    run
}

/// Logs attached to any version of `item`, or directly to `op` (version = None),
/// filtered to closed (end_time present).
fn collect_logs(store: &Store, item: &PlannedScheduleItem, op: &Operation) -> Vec<ProductionLog> {
    let versions = store.versions_for_item(&item.id);
    store
        .logs_for_operation(&op.id)
        .into_iter()
        .filter(|log| log.is_closed_and_counted())
        .filter(|log| match log.version_number {
            None => true,
            Some(v) => versions.iter().any(|ver| ver.version_number == v),
        })
        .collect()
}

/// Cascades a replan to every downstream operation (operation_number > current,
/// same order) whose work center is schedulable, advancing from `cascade_start`
/// and consulting each downstream machine's availability.
fn cascade_downstream(store: &Store, order: &Order, current_op: &Operation, mut cascade_start: DateTime<Utc>, seen: &mut HashMap<(String, u32, DateTime<Utc>), u32>, run: &mut RescheduleRun) {
    let downstream: Vec<Operation> = store.operations_for_order(&order.id).into_iter().filter(|o| o.operation_number > current_op.operation_number && store.machine_is_schedulable(&o.machine_id)).collect();

    for op in downstream {
        match machine_availability(store, &op.machine_id, cascade_start) {
            MachineAvailability::Available(at) => cascade_start = at,
            MachineAvailability::Unavailable => {
                run.diagnostics.push(format!("{}/{}: downstream operation {} skipped, machine {} unavailable indefinitely", order.part_number, order.production_order, op.operation_number, op.machine_id));
                return;
            }
        }

        let items = store.items_for_order_operation_machine(&order.id, &op.id, &op.machine_id);
        let Some(item) = items.into_iter().max_by(|a, b| a.id.value.cmp(&b.id.value)) else { continue };
        let Some(active) = store.active_version(&item.id) else { continue };

        let start_ist = calendar::adjust_to_shift(calendar::to_ist(cascade_start));
        let (_setup, after_setup) = fragment::split_setup(start_ist, op.setup_minutes());
        let (_prod, after_production) = fragment::split_production(after_setup, item.remaining_quantity.max(1), op.cycle_minutes());

        let new_version = ScheduleVersion {
            item_id: item.id.clone(),
            version_number: active.version_number + 1,
            planned_start_time: calendar::from_ist(start_ist),
            planned_end_time: calendar::from_ist(after_production),
            planned_quantity: item.remaining_quantity,
            completed_quantity: active.completed_quantity,
            remaining_quantity: item.remaining_quantity,
            is_active: true,
        };

        let dedup = (order.part_number.clone(), op.operation_number, new_version.planned_start_time);
        if seen.get(&dedup).map(|v| *v < new_version.version_number).unwrap_or(true) {
            seen.insert(dedup, new_version.version_number);
            cascade_start = calendar::from_ist(after_production);
            store.push_version(new_version);
            run.updated_items.push(item.id.clone());
        }
    }
}

enum MachineAvailability {
    Available(DateTime<Utc>),
    Unavailable,
}

/// Consults C5's `MachineRawLive` for `machine_id`: if OFF with a known
/// `available_from`, planning start is advanced to that time; if OFF indefinitely
/// (`available_from` unknown), the caller must skip the downstream operation.
fn machine_availability(store: &Store, machine_id: &MachineId, requested_start: DateTime<Utc>) -> MachineAvailability {
    match store.get_live(machine_id) {
        None => MachineAvailability::Available(requested_start),
        Some(live) if live.status != Status::Off => MachineAvailability::Available(requested_start),
        Some(live) => match live.available_from {
            Some(at) if at > requested_start => MachineAvailability::Available(at),
            Some(_) => MachineAvailability::Available(requested_start),
            None => MachineAvailability::Unavailable,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn build_store() -> (Store, Order, Operation, Operation) {
        let store = Store::new();
        let wc = WorkCenter { id: WorkCenterId::new("wc-1"), name: "Milling".into(), is_schedulable: true };
        store.put_work_center(wc.clone());
        let machine = Machine { id: MachineId::new("m-1"), name: "VMC-1".into(), work_center_id: wc.id.clone() };
        store.put_machine(machine.clone());
        let machine2 = Machine { id: MachineId::new("m-2"), name: "VMC-2".into(), work_center_id: wc.id.clone() };
        store.put_machine(machine2.clone());

        let order = Order {
            id: OrderId::new("o-1"),
            part_number: "P-1".into(),
            production_order: "PO-1".into(),
            required_quantity: 10,
            launched_quantity: 0,
            priority: 1,
            delivery_date: None,
            raw_material: None,
            project: None,
        };
        store.put_order(order.clone());

        let op1 = Operation { id: OperationId::new("op-1"), order_id: order.id.clone(), operation_number: 1, operation_description: "Mill".into(), machine_id: machine.id.clone(), work_center_id: wc.id.clone(), setup_time_hours: 0.5, ideal_cycle_time_hours: 5.0 / 60.0 };
        store.put_operation(op1.clone());
        let op2 = Operation { id: OperationId::new("op-2"), order_id: order.id.clone(), operation_number: 2, operation_description: "Deburr".into(), machine_id: machine2.id.clone(), work_center_id: wc.id.clone(), setup_time_hours: 0.1, ideal_cycle_time_hours: 2.0 / 60.0 };
        store.put_operation(op2.clone());

        (store, order, op1, op2)
    }

    #[test]
    fn partial_completion_creates_completed_and_remainder_versions() {
        let (store, order, op1, op2) = build_store();
        let item1 = ScheduleItemId::new("item-1");
        store.put_schedule_item(PlannedScheduleItem {
            id: item1.clone(),
            order_id: order.id.clone(),
            operation_id: op1.id.clone(),
            machine_id: op1.machine_id.clone(),
            total_quantity: 10,
            initial_start_time: Utc.with_ymd_and_hms(2026, 7, 27, 2, 30, 0).unwrap(),
            initial_end_time: Utc.with_ymd_and_hms(2026, 7, 27, 3, 30, 0).unwrap(),
            remaining_quantity: 10,
            status: ItemStatus::Scheduled,
            current_version: 1,
        });
        store.push_version(ScheduleVersion::new_initial(item1.clone(), Utc.with_ymd_and_hms(2026, 7, 27, 2, 30, 0).unwrap(), Utc.with_ymd_and_hms(2026, 7, 27, 3, 30, 0).unwrap(), 10));

        let item2 = ScheduleItemId::new("item-2");
        store.put_schedule_item(PlannedScheduleItem {
            id: item2.clone(),
            order_id: order.id.clone(),
            operation_id: op2.id.clone(),
            machine_id: op2.machine_id.clone(),
            total_quantity: 10,
            initial_start_time: Utc.with_ymd_and_hms(2026, 7, 27, 3, 30, 0).unwrap(),
            initial_end_time: Utc.with_ymd_and_hms(2026, 7, 27, 4, 0, 0).unwrap(),
            remaining_quantity: 10,
            status: ItemStatus::Scheduled,
            current_version: 1,
        });
        store.push_version(ScheduleVersion::new_initial(item2, Utc.with_ymd_and_hms(2026, 7, 27, 3, 30, 0).unwrap(), Utc.with_ymd_and_hms(2026, 7, 27, 4, 0, 0).unwrap(), 10));

        store.put_production_log(ProductionLog {
            id: store.new_log_id(),
            operation_id: op1.id.clone(),
            order_id: order.id.clone(),
            version_number: Some(1),
            machine_id: Some(op1.machine_id.clone()),
            start_time: Utc.with_ymd_and_hms(2026, 7, 27, 2, 30, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2026, 7, 27, 3, 0, 0).unwrap()),
            quantity_completed: 6,
            quantity_rejected: 0,
            notes: None,
        }).expect("quantity within required_quantity");

        let run = run(&store, &order.id);
        assert!(!run.updated_items.is_empty());

        let versions = store.versions_for_item(&item1);
        assert!(versions.len() >= 2, "expected a completed-portion version plus a remainder version");
        let active = store.active_version(&item1).expect("an active version remains");
        assert!(active.version_number > 1);
    }

    #[test]
    fn machine_off_indefinitely_skips_downstream_with_diagnostic() {
        let (store, order, op1, _op2) = build_store();
        store.put_live(MachineRawLive {
            machine_id: op1.machine_id.clone(),
            status: Status::Off,
            op_mode: None,
            selected_program: None,
            active_program: None,
            part_count: 0,
            timestamp: Utc.with_ymd_and_hms(2026, 7, 27, 2, 0, 0).unwrap(),
            scheduled_operation_id: None,
            actual_operation_id: None,
            available_from: None,
        });

        match machine_availability(&store, &op1.machine_id, Utc.with_ymd_and_hms(2026, 7, 27, 3, 0, 0).unwrap()) {
            MachineAvailability::Unavailable => {}
            MachineAvailability::Available(_) => panic!("expected machine to be reported unavailable"),
        }
        let _ = order;
    }
}
