//! OPC UA reader: node path set `{progStatus, opMode, actParts, progName,
//! selectedWorkPProg}`. Socket transport is out of scope; this module ships
//! the classification a real reader would apply to whatever its `opcua`-crate
//! client yields.

use super::{DeviceReader, DeviceSample, PartCounter};
use crate::error::{Error, Result};
use crate::model::{MachineId, Status};
use async_trait::async_trait;
use chrono::Utc;

/// A single polled OPC UA node set, prior to classification.
#[derive(Debug, Clone)]
pub struct OpcUaRawReading {
    pub prog_status: String,
    pub op_mode: String,
    pub act_parts: u64,
    pub prog_name: Option<String>,
    pub selected_work_p_prog: Option<String>,
}

/// `RUNNING` program status classifies as Production; anything else
/// connected classifies as Idle.
pub fn classify(reading: &OpcUaRawReading) -> Status {
    if reading.prog_status.eq_ignore_ascii_case("RUNNING") {
        Status::Production
    } else {
        Status::Idle
    }
}

/// A `DeviceReader` backed by a fixed sequence of readings, standing in for a
/// real `opcua` client connection.
pub struct SimulatedOpcUaReader {
    machine_id: MachineId,
    readings: std::vec::IntoIter<OpcUaRawReading>,
    counter: PartCounter,
}

impl SimulatedOpcUaReader {
    pub fn new(machine_id: MachineId, readings: Vec<OpcUaRawReading>) -> Self {
        SimulatedOpcUaReader { machine_id, readings: readings.into_iter(), counter: PartCounter::new() }
    }
}

#[async_trait]
impl DeviceReader for SimulatedOpcUaReader {
    async fn read_sample(&mut self) -> Result<DeviceSample> {
        let reading = self.readings.next().ok_or_else(|| Error::TransientIo("no more simulated readings".into()))?;
        let status = classify(&reading);
        Ok(DeviceSample {
            timestamp: Utc::now(),
            status,
            op_mode: Some(reading.op_mode.clone()),
            selected_program: reading.selected_work_p_prog.clone(),
            active_program: reading.prog_name.clone(),
            part_count: self.counter.observe_counter(reading.act_parts),
        })
    }

    fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_classifies_as_production() {
        let reading = OpcUaRawReading { prog_status: "RUNNING".into(), op_mode: "AUTO".into(), act_parts: 1, prog_name: None, selected_work_p_prog: None };
        assert_eq!(classify(&reading), Status::Production);
    }

    #[test]
    fn connected_but_idle_program_status_classifies_as_idle() {
        let reading = OpcUaRawReading { prog_status: "STOPPED".into(), op_mode: "AUTO".into(), act_parts: 1, prog_name: None, selected_work_p_prog: None };
        assert_eq!(classify(&reading), Status::Idle);
    }
}
