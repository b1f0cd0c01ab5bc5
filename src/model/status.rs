//! Live machine status entities: `Status`, `MachineRawLive`, `MachineRaw`,
//! `MachineDowntime`.

use crate::model::id::{DowntimeId, MachineId, OperationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// StatusLookup: closed enumeration {0: OFF, 1: IDLE/ON, 2: PRODUCTION}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Off = 0,
    Idle = 1,
    Production = 2,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One row per machine, always holding the latest known state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRawLive {
    pub machine_id: MachineId,
    pub status: Status,
    pub op_mode: Option<String>,
    pub selected_program: Option<String>,
    pub active_program: Option<String>,
    pub part_count: u64,
    pub timestamp: DateTime<Utc>,
    pub scheduled_operation_id: Option<OperationId>,
    pub actual_operation_id: Option<OperationId>,
    /// Known resume time while OFF, consulted by the dynamic rescheduler's
    /// machine-availability check. `None` while OFF means "indefinitely
    /// unavailable".
    pub available_from: Option<DateTime<Utc>>,
}

impl MachineRawLive {
    pub fn comparable_fields(&self) -> (Status, &Option<String>, &Option<String>, &Option<String>, u64, &Option<OperationId>, &Option<OperationId>) {
        (self.status, &self.op_mode, &self.selected_program, &self.active_program, self.part_count, &self.scheduled_operation_id, &self.actual_operation_id)
    }
}

/// Append-only transition history. A new row is written only when at least one
/// classified field differs from the live row (edge-triggered log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRaw {
    pub machine_id: MachineId,
    pub status: Status,
    pub op_mode: Option<String>,
    pub selected_program: Option<String>,
    pub active_program: Option<String>,
    pub part_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&MachineRawLive> for MachineRaw {
    fn from(live: &MachineRawLive) -> Self {
        MachineRaw {
            machine_id: live.machine_id.clone(),
            status: live.status,
            op_mode: live.op_mode.clone(),
            selected_program: live.selected_program.clone(),
            active_program: live.active_program.clone(),
            part_count: live.part_count,
            timestamp: live.timestamp,
        }
    }
}

/// At most one open downtime per machine; `closed_dt >= open_dt` when closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDowntime {
    pub id: DowntimeId,
    pub machine_id: MachineId,
    pub open_dt: DateTime<Utc>,
    pub closed_dt: Option<DateTime<Utc>>,
}

impl MachineDowntime {
    pub fn is_open(&self) -> bool {
        self.closed_dt.is_none()
    }
}
