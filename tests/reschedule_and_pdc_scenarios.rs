use chrono::{Duration, TimeZone, Utc};
use vrm_rust_workflow::model::*;
use vrm_rust_workflow::pdc::{self, PdcCache};
use vrm_rust_workflow::reschedule;
use vrm_rust_workflow::scheduler::{self, QuantityRequest};
use vrm_rust_workflow::status_engine::{apply_sample, DeviceSample};
use vrm_rust_workflow::store::Store;

fn seed_two_op_order(store: &Store) -> Order {
    let wc = WorkCenter { id: WorkCenterId::new("wc-1"), name: "Milling".into(), is_schedulable: true };
    store.put_work_center(wc.clone());
    let m1 = Machine { id: MachineId::new("m-1"), name: "VMC-1".into(), work_center_id: wc.id.clone() };
    let m2 = Machine { id: MachineId::new("m-2"), name: "VMC-2".into(), work_center_id: wc.id.clone() };
    store.put_machine(m1.clone());
    store.put_machine(m2.clone());

    let order = Order { id: OrderId::new("o-1"), part_number: "P-1".into(), production_order: "PO-1".into(), required_quantity: 10, launched_quantity: 0, priority: 1, delivery_date: None, raw_material: None, project: None };
    store.put_order(order.clone());

    store.put_operation(Operation { id: OperationId::new("op-1"), order_id: order.id.clone(), operation_number: 1, operation_description: "Mill".into(), machine_id: m1.id.clone(), work_center_id: wc.id.clone(), setup_time_hours: 0.1, ideal_cycle_time_hours: 5.0 / 60.0 });
    store.put_operation(Operation { id: OperationId::new("op-2"), order_id: order.id.clone(), operation_number: 2, operation_description: "Deburr".into(), machine_id: m2.id.clone(), work_center_id: wc.id.clone(), setup_time_hours: 0.05, ideal_cycle_time_hours: 2.0 / 60.0 });

    order
}

/// End-to-end: schedule a two-operation part, log partial completion of the
/// first operation, rerun the dynamic rescheduler, and confirm the cascade
/// produces a new active version for the downstream operation.
#[test]
fn reschedule_after_partial_completion_cascades_downstream() {
    let store = Store::new();
    let order = seed_two_op_order(&store);
    let activation = Utc.with_ymd_and_hms(2026, 7, 27, 2, 30, 0).unwrap();
    store.activate_part(&order.part_number, &order.production_order, activation);

    let mut requested = QuantityRequest::new();
    requested.insert((order.part_number.clone(), order.production_order.clone()), 10);
    scheduler::run(&store, &requested);

    let op1_items = store.items_for_order_operation_machine(&order.id, &OperationId::new("op-1"), &MachineId::new("m-1"));
    let item1 = op1_items.first().expect("op1 item scheduled");
    let downstream_items = store.items_for_order_operation_machine(&order.id, &OperationId::new("op-2"), &MachineId::new("m-2"));
    let item2 = downstream_items.first().expect("op2 item scheduled");
    let original_version2 = store.active_version(&item2.id).expect("op2 has an active version");

    store.put_production_log(ProductionLog {
        id: store.new_log_id(),
        operation_id: OperationId::new("op-1"),
        order_id: order.id.clone(),
        version_number: Some(1),
        machine_id: Some(MachineId::new("m-1")),
        start_time: item1.initial_start_time,
        end_time: Some(item1.initial_start_time + Duration::hours(1)),
        quantity_completed: 4,
        quantity_rejected: 0,
        notes: None,
    }).expect("quantity within required_quantity");

    let run = reschedule::run(&store, &order.id);
    assert!(!run.updated_items.is_empty());

    let new_active2 = store.active_version(&item2.id).expect("op2 still has an active version");
    assert!(new_active2.version_number > original_version2.version_number, "cascade must create a new version for the downstream operation");
}

/// An energy-meter reading above threshold classifies as Production and feeds
/// C6's OEE reconciliation through the shared write path.
#[test]
fn status_classification_from_energy_feeds_oee() {
    let store = Store::new();
    let machine_id = MachineId::new("m-energy");
    let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 0, 30, 0).unwrap(); // 06:00 IST

    apply_sample(&store, &machine_id, DeviceSample { timestamp: t0, status: Status::Production, op_mode: None, selected_program: None, active_program: None, part_count: 0 });

    let live = store.get_live(&machine_id).expect("live row written");
    assert_eq!(live.status, Status::Production);

    let summary = store.get_shift_summary(&machine_id, "shift_1", t0);
    assert!(summary.is_some(), "C6 update must run as part of the write policy");
}

/// A part with logged-but-incomplete production is reported `in_progress` by the
/// PDC projector, with the reschedule output as its data source.
#[test]
fn pdc_reports_in_progress_after_partial_log() {
    let store = Store::new();
    let order = seed_two_op_order(&store);
    let activation = Utc.with_ymd_and_hms(2026, 7, 27, 2, 30, 0).unwrap();
    store.activate_part(&order.part_number, &order.production_order, activation);

    let mut requested = QuantityRequest::new();
    requested.insert((order.part_number.clone(), order.production_order.clone()), 10);
    scheduler::run(&store, &requested);

    let op1_items = store.items_for_order_operation_machine(&order.id, &OperationId::new("op-1"), &MachineId::new("m-1"));
    let item1 = op1_items.first().expect("op1 item scheduled");
    store.put_production_log(ProductionLog {
        id: store.new_log_id(),
        operation_id: OperationId::new("op-1"),
        order_id: order.id.clone(),
        version_number: Some(1),
        machine_id: Some(MachineId::new("m-1")),
        start_time: item1.initial_start_time,
        end_time: Some(item1.initial_start_time + Duration::hours(1)),
        quantity_completed: 4,
        quantity_rejected: 0,
        notes: None,
    }).expect("quantity within required_quantity");

    let mut cache = PdcCache::new(Duration::seconds(30));
    let row = pdc::project(&store, &mut cache, &order.id, activation).expect("order has a plan");
    assert_eq!(row.status, pdc::PdcStatus::InProgress);
}
