//! ShiftSummary / ConfigInfo: per-shift OEE aggregates and their denominators.

use crate::model::id::MachineId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// identity = (machine, shift_id, shift_start_datetime).
#[derive(Debug, Clone)]
pub struct ShiftSummary {
    pub machine_id: MachineId,
    pub shift_id: String,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,

    pub off_time: Duration,
    pub idle_time: Duration,
    pub production_time: Duration,

    pub total_parts: u64,
    pub good_parts: u64,
    pub bad_parts: u64,

    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
}

impl ShiftSummary {
    pub fn new_zero(machine_id: MachineId, shift_id: impl Into<String>, shift_start: DateTime<Utc>, shift_end: DateTime<Utc>) -> Self {
        ShiftSummary {
            machine_id,
            shift_id: shift_id.into(),
            shift_start,
            shift_end,
            off_time: Duration::zero(),
            idle_time: Duration::zero(),
            production_time: Duration::zero(),
            total_parts: 0,
            good_parts: 0,
            bad_parts: 0,
            availability: 0.0,
            performance: 0.0,
            quality: 0.0,
            oee: 0.0,
        }
    }

    pub fn availability_loss(&self) -> f64 {
        1.0 - self.availability
    }
    pub fn performance_loss(&self) -> f64 {
        1.0 - self.performance
    }
    pub fn quality_loss(&self) -> f64 {
        1.0 - self.quality
    }

    pub fn shift_length(&self) -> Duration {
        self.shift_end - self.shift_start
    }
}

/// Per-machine OEE denominators, loaded per shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub machine_id: MachineId,
    pub planned_non_production_minutes: f64,
    pub planned_downtime_minutes: f64,
}

impl ConfigInfo {
    /// T = shift_length - planned_non_production - planned_downtime.
    pub fn available_minutes(&self, shift_length: Duration) -> f64 {
        (shift_length.num_seconds() as f64 / 60.0) - self.planned_non_production_minutes - self.planned_downtime_minutes
    }
}
