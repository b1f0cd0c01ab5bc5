//! PartScheduleStatus: activation lifecycle of a production order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    Active,
    Inactive,
}

/// Identity is the production_order. Created lazily on first activation, never
/// deleted. `activation_timestamp` only advances on an inactive -> active
/// transition; a redundant re-activation is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartScheduleStatus {
    pub production_order: String,
    pub part_number: String,
    pub state: ActivationState,
    pub activation_timestamp: DateTime<Utc>,
}

impl PartScheduleStatus {
    pub fn new_inactive(part_number: impl Into<String>, production_order: impl Into<String>, now: DateTime<Utc>) -> Self {
        PartScheduleStatus { production_order: production_order.into(), part_number: part_number.into(), state: ActivationState::Inactive, activation_timestamp: now }
    }

    /// Transitions inactive -> active, advancing the activation timestamp.
    /// Idempotent: re-activating an already-active order leaves the timestamp fixed.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        if self.state == ActivationState::Inactive {
            self.state = ActivationState::Active;
            self.activation_timestamp = now;
        }
    }

    pub fn deactivate(&mut self) {
        self.state = ActivationState::Inactive;
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reactivation_is_idempotent() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 27, 1, 0, 0).unwrap();
        let mut status = PartScheduleStatus::new_inactive("P1", "PO-1", t0);
        let t1 = Utc.with_ymd_and_hms(2026, 7, 27, 2, 0, 0).unwrap();
        status.activate(t1);
        assert_eq!(status.activation_timestamp, t1);

        // Re-activating while already active must not move the timestamp.
        let t2 = Utc.with_ymd_and_hms(2026, 7, 27, 3, 0, 0).unwrap();
        status.activate(t2);
        assert_eq!(status.activation_timestamp, t1);
    }
}
