//! PlannedScheduleItem / ScheduleVersion: the persisted plan and its revision history.

use crate::model::id::{MachineId, OperationId, OrderId, ScheduleItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Scheduled,
    InProgress,
    Completed,
    Invalidated,
}

/// Dedup key for a generation run: (order, operation, machine, total_quantity,
/// initial_start_time, initial_end_time).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleDedupKey {
    pub order_id: OrderId,
    pub operation_id: OperationId,
    pub machine_id: MachineId,
    pub total_quantity: u32,
    pub initial_start_time: DateTime<Utc>,
    pub initial_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedScheduleItem {
    pub id: ScheduleItemId,
    pub order_id: OrderId,
    pub operation_id: OperationId,
    pub machine_id: MachineId,
    pub total_quantity: u32,
    pub initial_start_time: DateTime<Utc>,
    pub initial_end_time: DateTime<Utc>,
    pub remaining_quantity: u32,
    pub status: ItemStatus,
    /// Pointer to the currently active `ScheduleVersion.version_number`.
    pub current_version: u32,
}

impl PlannedScheduleItem {
    pub fn dedup_key(&self) -> ScheduleDedupKey {
        ScheduleDedupKey {
            order_id: self.order_id.clone(),
            operation_id: self.operation_id.clone(),
            machine_id: self.machine_id.clone(),
            total_quantity: self.total_quantity,
            initial_start_time: self.initial_start_time,
            initial_end_time: self.initial_end_time,
        }
    }

    /// Same (order, operation, machine, total_quantity) but a *different*
    /// start_time — the pre-existing item must be marked invalidated rather than
    /// silently superseded.
    pub fn same_slot_different_start(&self, other: &ScheduleDedupKey) -> bool {
        self.order_id == other.order_id
            && self.operation_id == other.operation_id
            && self.machine_id == other.machine_id
            && self.total_quantity == other.total_quantity
            && self.initial_start_time != other.initial_start_time
    }
}

/// Child of a `PlannedScheduleItem`; `version_number` starts at 1 and increases
/// monotonically. At most one version per item has `is_active == true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleVersion {
    pub item_id: ScheduleItemId,
    pub version_number: u32,
    pub planned_start_time: DateTime<Utc>,
    pub planned_end_time: DateTime<Utc>,
    pub planned_quantity: u32,
    pub completed_quantity: u32,
    pub remaining_quantity: u32,
    pub is_active: bool,
}

impl ScheduleVersion {
    pub fn new_initial(item_id: ScheduleItemId, start: DateTime<Utc>, end: DateTime<Utc>, quantity: u32) -> Self {
        ScheduleVersion {
            item_id,
            version_number: 1,
            planned_start_time: start,
            planned_end_time: end,
            planned_quantity: quantity,
            completed_quantity: 0,
            remaining_quantity: quantity,
            is_active: true,
        }
    }
}

/// One fragment of a generated schedule, emitted by the batch scheduler / dynamic
/// rescheduler's shift-fragmentation logic. A tagged record rather than a row in a
/// shared table, so each fragment carries its own identity independent of how it's
/// later grouped or displayed.
#[derive(Debug, Clone)]
pub struct ScheduleRecord {
    pub part_number: String,
    pub operation_description: String,
    pub machine_id: MachineId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub quantity_label: String,
    pub production_order: String,
}
