//! ProductionLog: a recorded span of actual production against an operation.

use crate::model::id::{MachineId, OperationId, OrderId, ProductionLogId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLog {
    pub id: ProductionLogId,
    pub operation_id: OperationId,
    pub order_id: OrderId,
    /// Optional: a log may be attached to a schedule version or directly to the
    /// operation (version = None).
    pub version_number: Option<u32>,
    pub machine_id: Option<MachineId>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub quantity_completed: u32,
    pub quantity_rejected: u32,
    pub notes: Option<String>,
}

impl ProductionLog {
    /// A log usable for rescheduling/OEE accumulation needs a closed end_time —
    /// an open log describes work still in progress.
    pub fn is_closed_and_counted(&self) -> bool {
        self.end_time.is_some()
    }
}
