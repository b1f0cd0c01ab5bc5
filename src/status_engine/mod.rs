//! Live Status Engine: turns per-device samples into durable machine state.
//!
//! Device transport specifics (sockets, serial ports) are out of scope; each
//! protocol module ships the classification/ledger logic plus a
//! `SimulatedReader` behind a thin transport trait ([`DeviceReader`]) that
//! yields a typed sample ([`DeviceSample`]), independent of the underlying
//! wire protocol.

pub mod lsv2;
pub mod modbus;
pub mod opcua;
pub mod poller;

use crate::model::{MachineId, MachineRaw, MachineRawLive, Status};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One raw reading from a device, already protocol-classified into a `Status` and
/// the fields C5's write policy tracks for edge-triggering.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub op_mode: Option<String>,
    pub selected_program: Option<String>,
    pub active_program: Option<String>,
    /// Cumulative part counter, or a monotonically-increasing surrogate derived
    /// from a rising-edge marker.
    pub part_count: u64,
}

/// Transport seam for one device. A connect failure or read timeout must surface
/// as `Error::TransientIo`, which the poller treats as an OFF sample rather than
/// propagating.
#[async_trait]
pub trait DeviceReader: Send {
    async fn read_sample(&mut self) -> crate::error::Result<DeviceSample>;
    fn machine_id(&self) -> &MachineId;
}

/// Applies one sample to the store, edge-triggering the append-only history and
/// downtime ledger only when a classified field actually changed, then runs the
/// OEE engine's `update` hook. Pure with respect to its inputs beyond the store,
/// so it is the unit this module tests directly instead of spinning up a poller.
pub fn apply_sample(store: &Store, machine_id: &MachineId, sample: DeviceSample) {
    let previous_live = store.get_live(machine_id);
    let was_off = previous_live.as_ref().map(|l| l.status == Status::Off).unwrap_or(false);
    let is_off = sample.status == Status::Off;

    let live = MachineRawLive {
        machine_id: machine_id.clone(),
        status: sample.status,
        op_mode: sample.op_mode.clone(),
        selected_program: sample.selected_program.clone(),
        active_program: sample.active_program.clone(),
        part_count: sample.part_count,
        timestamp: sample.timestamp,
        scheduled_operation_id: previous_live.as_ref().and_then(|l| l.scheduled_operation_id.clone()),
        actual_operation_id: previous_live.as_ref().and_then(|l| l.actual_operation_id.clone()),
        available_from: if is_off { previous_live.as_ref().and_then(|l| l.available_from) } else { None },
    };

    let changed = previous_live.as_ref().map(|prev| prev.comparable_fields() != live.comparable_fields()).unwrap_or(true);
    store.put_live(live.clone());
    if changed {
        store.append_raw(MachineRaw::from(&live));
    }

    if is_off && !was_off {
        store.open_downtime(machine_id, sample.timestamp);
    } else if !is_off && was_off {
        store.close_open_downtime(machine_id, sample.timestamp);
    }

    if changed {
        crate::oee::update(store, sample.timestamp, machine_id);
    }
}

/// Tracks the previous sample's counter/marker to derive edge-triggered part
/// counts: a re-read of the same raw value must not double-count.
#[derive(Debug, Default)]
pub struct PartCounter {
    last_raw: u64,
    total: u64,
}

impl PartCounter {
    pub fn new() -> Self {
        PartCounter::default()
    }

    /// Feeds a new raw counter reading; returns the accumulated total. A reading
    /// less than or equal to the last one (a re-read, or a counter reset reported
    /// as 0) contributes nothing.
    pub fn observe_counter(&mut self, raw: u64) -> u64 {
        if raw > self.last_raw {
            self.total += raw - self.last_raw;
        }
        self.last_raw = raw;
        self.total
    }

    /// Feeds a boolean marker; only a false->true transition increments the total.
    pub fn observe_rising_edge(&mut self, marker: bool) -> u64 {
        if marker && self.last_raw == 0 {
            self.total += 1;
            self.last_raw = 1;
        } else if !marker {
            self.last_raw = 0;
        }
        self.total
    }
}

/// Flushes a final OFF record for `machine_id` and closes its downtime ledger.
pub fn flush_shutdown(store: &Store, machine_id: &MachineId, now: DateTime<Utc>) {
    apply_sample(store, machine_id, DeviceSample { timestamp: now, status: Status::Off, op_mode: None, selected_program: None, active_program: None, part_count: store.get_live(machine_id).map(|l| l.part_count).unwrap_or(0) });
}
