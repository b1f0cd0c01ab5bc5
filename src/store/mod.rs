//! Data Model & Store.
//!
//! One table per entity behind a single `RwLock`, with secondary indexes for
//! the lookups the scheduler, rescheduler, and OEE engine need. HTTP/REST
//! transport and master-data CRUD are out of scope; this module is the
//! persistence *seam* a real database-backed implementation would sit behind.
//!
//! Single-writer-per-machine is honored naturally: every mutating method here
//! takes `&self` and locks only the table(s) it touches, and callers in the
//! status engine only ever address their own machine's rows.

use crate::model::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    order_by_key: HashMap<(String, String), OrderId>,

    operations: HashMap<OperationId, Operation>,
    operations_by_order: HashMap<OrderId, Vec<OperationId>>,

    machines: HashMap<MachineId, Machine>,
    work_centers: HashMap<WorkCenterId, WorkCenter>,

    part_status: HashMap<String, PartScheduleStatus>,

    schedule_items: HashMap<ScheduleItemId, PlannedScheduleItem>,
    schedule_versions: HashMap<ScheduleItemId, Vec<ScheduleVersion>>,

    production_logs: HashMap<ProductionLogId, ProductionLog>,
    logs_by_operation: HashMap<OperationId, Vec<ProductionLogId>>,

    machine_raw_live: HashMap<MachineId, MachineRawLive>,
    machine_raw: HashMap<MachineId, Vec<MachineRaw>>,

    downtimes: HashMap<MachineId, Vec<MachineDowntime>>,

    shift_summaries: HashMap<(MachineId, String, DateTime<Utc>), ShiftSummary>,

    config_info: HashMap<MachineId, ConfigInfo>,
}

/// In-memory reference implementation of the Data Model & Store contract.
pub struct Store {
    tables: RwLock<Tables>,
    next_surrogate: std::sync::atomic::AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store { tables: RwLock::new(Tables::default()), next_surrogate: std::sync::atomic::AtomicU64::new(1) }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_surrogate.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{prefix}-{n}")
    }

    // --- Orders -----------------------------------------------------------

    pub fn put_order(&self, order: Order) {
        let mut t = self.tables.write().expect("store lock poisoned");
        t.order_by_key.insert(order.key(), order.id.clone());
        t.orders.insert(order.id.clone(), order);
    }

    pub fn get_order(&self, id: &OrderId) -> Option<Order> {
        self.tables.read().expect("store lock poisoned").orders.get(id).cloned()
    }

    pub fn get_order_by_key(&self, part_number: &str, production_order: &str) -> Option<Order> {
        let t = self.tables.read().expect("store lock poisoned");
        let id = t.order_by_key.get(&(part_number.to_string(), production_order.to_string()))?;
        t.orders.get(id).cloned()
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.tables.read().expect("store lock poisoned").orders.values().cloned().collect()
    }

    // --- Operations ---------------------------------------------------------

    pub fn put_operation(&self, op: Operation) {
        let mut t = self.tables.write().expect("store lock poisoned");
        t.operations_by_order.entry(op.order_id.clone()).or_default().push(op.id.clone());
        t.operations.insert(op.id.clone(), op);
    }

    pub fn get_operation(&self, id: &OperationId) -> Option<Operation> {
        self.tables.read().expect("store lock poisoned").operations.get(id).cloned()
    }

    /// Operations of `order_id`, ordered ascending by `operation_number`.
    pub fn operations_for_order(&self, order_id: &OrderId) -> Vec<Operation> {
        let t = self.tables.read().expect("store lock poisoned");
        let mut ops: Vec<Operation> = t
            .operations_by_order
            .get(order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.operations.get(id).cloned())
            .collect();
        ops.sort_by_key(|o| o.operation_number);
        ops
    }

    pub fn find_operation_by_number(&self, order_id: &OrderId, operation_number: u32) -> Option<Operation> {
        self.operations_for_order(order_id).into_iter().find(|o| o.operation_number == operation_number)
    }

    // --- Machines / work centers --------------------------------------------

    pub fn put_machine(&self, machine: Machine) {
        self.tables.write().expect("store lock poisoned").machines.insert(machine.id.clone(), machine);
    }

    pub fn get_machine(&self, id: &MachineId) -> Option<Machine> {
        self.tables.read().expect("store lock poisoned").machines.get(id).cloned()
    }

    pub fn put_work_center(&self, wc: WorkCenter) {
        self.tables.write().expect("store lock poisoned").work_centers.insert(wc.id.clone(), wc);
    }

    pub fn get_work_center(&self, id: &WorkCenterId) -> Option<WorkCenter> {
        self.tables.read().expect("store lock poisoned").work_centers.get(id).cloned()
    }

    /// True if `machine_id`'s work center is schedulable and the machine is not the
    /// `Default/Default/Default` sentinel.
    pub fn machine_is_schedulable(&self, machine_id: &MachineId) -> bool {
        let Some(machine) = self.get_machine(machine_id) else { return false };
        if machine.is_sentinel() {
            return false;
        }
        self.get_work_center(&machine.work_center_id).map(|wc| wc.is_schedulable).unwrap_or(false)
    }

    // --- Part schedule status ------------------------------------------------

    pub fn get_part_status(&self, production_order: &str) -> Option<PartScheduleStatus> {
        self.tables.read().expect("store lock poisoned").part_status.get(production_order).cloned()
    }

    pub fn activate_part(&self, part_number: &str, production_order: &str, now: DateTime<Utc>) {
        let mut t = self.tables.write().expect("store lock poisoned");
        t.part_status
            .entry(production_order.to_string())
            .and_modify(|s| s.activate(now))
            .or_insert_with(|| {
                let mut s = PartScheduleStatus::new_inactive(part_number, production_order, now);
                s.activate(now);
                s
            });
    }

    pub fn all_active_parts(&self) -> Vec<PartScheduleStatus> {
        self.tables.read().expect("store lock poisoned").part_status.values().filter(|s| s.is_active()).cloned().collect()
    }

    // --- Schedule items / versions -------------------------------------------

    pub fn new_schedule_item_id(&self) -> ScheduleItemId {
        ScheduleItemId::new(self.next_id("item"))
    }

    pub fn put_schedule_item(&self, item: PlannedScheduleItem) {
        self.tables.write().expect("store lock poisoned").schedule_items.insert(item.id.clone(), item);
    }

    pub fn get_schedule_item(&self, id: &ScheduleItemId) -> Option<PlannedScheduleItem> {
        self.tables.read().expect("store lock poisoned").schedule_items.get(id).cloned()
    }

    pub fn set_item_status(&self, id: &ScheduleItemId, status: ItemStatus) {
        if let Some(item) = self.tables.write().expect("store lock poisoned").schedule_items.get_mut(id) {
            item.status = status;
        }
    }

    /// Items whose dedup-relevant fields match an existing item with a different
    /// start_time; used by the batch scheduler to invalidate stale entries.
    pub fn items_for_order_operation_machine(&self, order_id: &OrderId, operation_id: &OperationId, machine_id: &MachineId) -> Vec<PlannedScheduleItem> {
        self.tables
            .read()
            .expect("store lock poisoned")
            .schedule_items
            .values()
            .filter(|i| &i.order_id == order_id && &i.operation_id == operation_id && &i.machine_id == machine_id)
            .cloned()
            .collect()
    }

    pub fn items_for_order(&self, order_id: &OrderId) -> Vec<PlannedScheduleItem> {
        self.tables.read().expect("store lock poisoned").schedule_items.values().filter(|i| &i.order_id == order_id).cloned().collect()
    }

    pub fn all_schedule_items(&self) -> Vec<PlannedScheduleItem> {
        self.tables.read().expect("store lock poisoned").schedule_items.values().cloned().collect()
    }

    pub fn push_version(&self, mut version: ScheduleVersion) {
        let mut t = self.tables.write().expect("store lock poisoned");
        if version.is_active {
            if let Some(versions) = t.schedule_versions.get_mut(&version.item_id) {
                for v in versions.iter_mut() {
                    v.is_active = false;
                }
            }
        }
        let versions = t.schedule_versions.entry(version.item_id.clone()).or_default();
        if version.version_number == 0 {
            version.version_number = versions.len() as u32 + 1;
        }
        if let Some(item) = t.schedule_items.get_mut(&version.item_id) {
            item.current_version = version.version_number;
        }
        versions.push(version);
    }

    pub fn versions_for_item(&self, item_id: &ScheduleItemId) -> Vec<ScheduleVersion> {
        self.tables.read().expect("store lock poisoned").schedule_versions.get(item_id).cloned().unwrap_or_default()
    }

    /// The single active version of an item, if any. At most one version per
    /// item may have `is_active == true`.
    pub fn active_version(&self, item_id: &ScheduleItemId) -> Option<ScheduleVersion> {
        self.versions_for_item(item_id).into_iter().find(|v| v.is_active)
    }

    // --- Production logs ------------------------------------------------------

    pub fn new_log_id(&self) -> ProductionLogId {
        ProductionLogId::new(self.next_id("log"))
    }

    /// Rejects a log whose `quantity_completed`, added to the order's existing
    /// logged quantity across all its operations, would exceed
    /// `Order.required_quantity`. Nothing is persisted when rejected.
    pub fn put_production_log(&self, log: ProductionLog) -> crate::error::Result<()> {
        let mut t = self.tables.write().expect("store lock poisoned");

        if let Some(order) = t.orders.get(&log.order_id) {
            let already_logged: u32 = t
                .production_logs
                .values()
                .filter(|l| l.order_id == log.order_id)
                .map(|l| l.quantity_completed)
                .sum();
            let projected = already_logged + log.quantity_completed;
            if projected > order.required_quantity {
                return Err(crate::error::Error::State(format!(
                    "production log for order {} would bring cumulative quantity_completed to {projected}, exceeding required_quantity {}",
                    log.order_id, order.required_quantity
                )));
            }
        }

        t.logs_by_operation.entry(log.operation_id.clone()).or_default().push(log.id.clone());
        t.production_logs.insert(log.id.clone(), log);
        Ok(())
    }

    pub fn logs_for_operation(&self, operation_id: &OperationId) -> Vec<ProductionLog> {
        let t = self.tables.read().expect("store lock poisoned");
        t.logs_by_operation.get(operation_id).into_iter().flatten().filter_map(|id| t.production_logs.get(id).cloned()).collect()
    }

    pub fn logs_for_order(&self, order_id: &OrderId) -> Vec<ProductionLog> {
        self.tables.read().expect("store lock poisoned").production_logs.values().filter(|l| &l.order_id == order_id).cloned().collect()
    }

    pub fn logs_for_machine_in_window(&self, machine_id: &MachineId, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<ProductionLog> {
        self.tables
            .read()
            .expect("store lock poisoned")
            .production_logs
            .values()
            .filter(|l| l.machine_id.as_ref() == Some(machine_id))
            .filter(|l| l.start_time < end && l.end_time.map(|e| e > start).unwrap_or(false))
            .cloned()
            .collect()
    }

    // --- Live status ------------------------------------------------------------

    pub fn get_live(&self, machine_id: &MachineId) -> Option<MachineRawLive> {
        self.tables.read().expect("store lock poisoned").machine_raw_live.get(machine_id).cloned()
    }

    pub fn put_live(&self, live: MachineRawLive) {
        self.tables.write().expect("store lock poisoned").machine_raw_live.insert(live.machine_id.clone(), live);
    }

    pub fn append_raw(&self, raw: MachineRaw) {
        let mut t = self.tables.write().expect("store lock poisoned");
        t.machine_raw.entry(raw.machine_id.clone()).or_default().push(raw);
    }

    /// MachineRaw rows for `machine_id` in `[start, end]`, in timestamp order, plus
    /// the single row immediately preceding `start` if one exists (needed to
    /// reconstruct the state that was in effect at `start`).
    pub fn raw_in_window(&self, machine_id: &MachineId, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<MachineRaw> {
        let t = self.tables.read().expect("store lock poisoned");
        let Some(rows) = t.machine_raw.get(machine_id) else { return Vec::new() };
        let mut preceding: Option<&MachineRaw> = None;
        let mut in_window: Vec<MachineRaw> = Vec::new();
        for row in rows {
            if row.timestamp <= start {
                if preceding.map(|p| p.timestamp < row.timestamp).unwrap_or(true) {
                    preceding = Some(row);
                }
            } else if row.timestamp <= end {
                in_window.push(row.clone());
            }
        }
        let mut result: Vec<MachineRaw> = preceding.cloned().into_iter().collect();
        result.extend(in_window);
        result.sort_by_key(|r| r.timestamp);
        result
    }

    // --- Downtime ledger ---------------------------------------------------------

    pub fn open_downtime(&self, machine_id: &MachineId, now: DateTime<Utc>) -> Option<MachineDowntime> {
        let mut t = self.tables.write().expect("store lock poisoned");
        let entries = t.downtimes.entry(machine_id.clone()).or_default();
        if entries.iter().any(|d| d.is_open()) {
            return None;
        }
        let id = DowntimeId::new(self.next_id("downtime"));
        let downtime = MachineDowntime { id, machine_id: machine_id.clone(), open_dt: now, closed_dt: None };
        entries.push(downtime.clone());
        Some(downtime)
    }

    pub fn close_open_downtime(&self, machine_id: &MachineId, now: DateTime<Utc>) -> Option<MachineDowntime> {
        let mut t = self.tables.write().expect("store lock poisoned");
        let entries = t.downtimes.get_mut(machine_id)?;
        let downtime = entries.iter_mut().find(|d| d.is_open())?;
        downtime.closed_dt = Some(now);
        Some(downtime.clone())
    }

    pub fn has_open_downtime(&self, machine_id: &MachineId) -> bool {
        self.tables.read().expect("store lock poisoned").downtimes.get(machine_id).map(|d| d.iter().any(|d| d.is_open())).unwrap_or(false)
    }

    // --- Shift summaries ------------------------------------------------------------

    pub fn get_shift_summary(&self, machine_id: &MachineId, shift_id: &str, shift_start: DateTime<Utc>) -> Option<ShiftSummary> {
        self.tables.read().expect("store lock poisoned").shift_summaries.get(&(machine_id.clone(), shift_id.to_string(), shift_start)).cloned()
    }

    pub fn put_shift_summary(&self, summary: ShiftSummary) {
        let key = (summary.machine_id.clone(), summary.shift_id.clone(), summary.shift_start);
        self.tables.write().expect("store lock poisoned").shift_summaries.insert(key, summary);
    }

    // --- Config info ---------------------------------------------------------------

    pub fn get_config_info(&self, machine_id: &MachineId) -> Option<ConfigInfo> {
        self.tables.read().expect("store lock poisoned").config_info.get(machine_id).cloned()
    }

    pub fn put_config_info(&self, config: ConfigInfo) {
        self.tables.write().expect("store lock poisoned").config_info.insert(config.machine_id.clone(), config);
    }
}
