//! Order / Operation / Machine / WorkCenter entities.

use crate::model::id::{MachineId, OperationId, OrderId, WorkCenterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A production order: identity is (part_number, production_order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub part_number: String,
    pub production_order: String,
    pub required_quantity: u32,
    pub launched_quantity: u32,
    /// Lower value = higher priority.
    pub priority: i64,
    pub delivery_date: Option<DateTime<Utc>>,
    pub raw_material: Option<String>,
    pub project: Option<String>,
}

impl Order {
    pub fn key(&self) -> (String, String) {
        (self.part_number.clone(), self.production_order.clone())
    }
}

/// One step of an order's operation graph, bound to a specific machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub order_id: OrderId,
    /// 1..N, strictly increasing within an order.
    pub operation_number: u32,
    pub operation_description: String,
    pub machine_id: MachineId,
    pub work_center_id: WorkCenterId,
    /// Setup time in hours, stored as a rational (here: f64); converted to minutes
    /// or seconds at the consuming boundary.
    pub setup_time_hours: f64,
    /// Ideal cycle time per piece, in hours.
    pub ideal_cycle_time_hours: f64,
}

impl Operation {
    pub fn setup_minutes(&self) -> f64 {
        self.setup_time_hours * 60.0
    }
    pub fn cycle_minutes(&self) -> f64 {
        self.ideal_cycle_time_hours * 60.0
    }
    pub fn cycle_seconds(&self) -> f64 {
        self.ideal_cycle_time_hours * 3600.0
    }
}

/// Fallback timing used when an `Operation` definition cannot be found: setup = 30
/// min, cycle = 5 min.
pub const DEFAULT_SETUP_MINUTES: f64 = 30.0;
pub const DEFAULT_CYCLE_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCenter {
    pub id: WorkCenterId,
    pub name: String,
    pub is_schedulable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub work_center_id: WorkCenterId,
}

/// Sentinel machine name excluded from every generated schedule.
pub const DEFAULT_MACHINE_SENTINEL: &str = "Default/Default/Default";

impl Machine {
    pub fn is_sentinel(&self) -> bool {
        self.name == DEFAULT_MACHINE_SENTINEL
    }
}
