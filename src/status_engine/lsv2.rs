//! HEIDENHAIN LSV2 reader: `program_status`, `execution_state`,
//! `program_stack` (parsed for main/current program names); part-completion
//! is a PLC marker at address M4170 (machines 1,2,5) or DWORD 2592 == 255
//! (others), read edge-triggered. Serial transport is out of scope.

use super::{DeviceReader, DeviceSample, PartCounter};
use crate::error::{Error, Result};
use crate::model::{MachineId, Status};
use async_trait::async_trait;
use chrono::Utc;

/// Which part-completion marker a given machine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMarker {
    /// Machines 1, 2, 5: boolean coil at M4170.
    BitMarker,
    /// All others: DWORD 2592, complete when it reads 255.
    WordMarker,
}

impl CompletionMarker {
    pub fn for_machine_number(n: u32) -> Self {
        match n {
            1 | 2 | 5 => CompletionMarker::BitMarker,
            _ => CompletionMarker::WordMarker,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lsv2RawReading {
    pub program_status: String,
    pub execution_state: String,
    pub program_stack: String,
    /// Raw completion marker value: the bit (0/1) or the DWORD, depending on
    /// `CompletionMarker`.
    pub completion_marker_raw: u32,
}

/// `RUNNING` execution (or program) status classifies as Production;
/// anything else connected classifies as Idle.
pub fn classify(reading: &Lsv2RawReading) -> Status {
    if reading.execution_state.eq_ignore_ascii_case("RUNNING") || reading.program_status.eq_ignore_ascii_case("RUNNING") {
        Status::Production
    } else {
        Status::Idle
    }
}

/// Extracts the main/current program names from a `program_stack` blob of the
/// form `MAIN.H:CURRENT.H`.
pub fn parse_program_stack(stack: &str) -> (Option<String>, Option<String>) {
    let mut parts = stack.splitn(2, ':');
    let main = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let current = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    (main, current)
}

pub struct SimulatedLsv2Reader {
    machine_id: MachineId,
    marker: CompletionMarker,
    readings: std::vec::IntoIter<Lsv2RawReading>,
    counter: PartCounter,
}

impl SimulatedLsv2Reader {
    pub fn new(machine_id: MachineId, marker: CompletionMarker, readings: Vec<Lsv2RawReading>) -> Self {
        SimulatedLsv2Reader { machine_id, marker, readings: readings.into_iter(), counter: PartCounter::new() }
    }
}

#[async_trait]
impl DeviceReader for SimulatedLsv2Reader {
    async fn read_sample(&mut self) -> Result<DeviceSample> {
        let reading = self.readings.next().ok_or_else(|| Error::TransientIo("no more simulated readings".into()))?;
        let status = classify(&reading);
        let (main, current) = parse_program_stack(&reading.program_stack);

        let part_count = match self.marker {
            CompletionMarker::BitMarker => self.counter.observe_rising_edge(reading.completion_marker_raw != 0),
            CompletionMarker::WordMarker => {
                if reading.completion_marker_raw == 255 {
                    self.counter.observe_rising_edge(true)
                } else {
                    self.counter.observe_rising_edge(false)
                }
            }
        };

        Ok(DeviceSample { timestamp: Utc::now(), status, op_mode: Some(reading.program_status.clone()), selected_program: main, active_program: current, part_count })
    }

    fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_marker_counts_only_rising_edges() {
        let reading_on = Lsv2RawReading { program_status: "RUNNING".into(), execution_state: "RUNNING".into(), program_stack: "MAIN.H:CUR.H".into(), completion_marker_raw: 1 };
        let reading_still_on = reading_on.clone();
        let reading_off = Lsv2RawReading { completion_marker_raw: 0, ..reading_on.clone() };

        let mut reader = SimulatedLsv2Reader::new(MachineId::new("m-1"), CompletionMarker::BitMarker, vec![reading_on, reading_still_on, reading_off]);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let s1 = rt.block_on(reader.read_sample()).unwrap();
        let s2 = rt.block_on(reader.read_sample()).unwrap();
        let s3 = rt.block_on(reader.read_sample()).unwrap();
        assert_eq!(s1.part_count, 1);
        assert_eq!(s2.part_count, 1, "marker held high must not re-count");
        assert_eq!(s3.part_count, 1);
    }

    #[test]
    fn program_stack_parses_main_and_current() {
        let (main, current) = parse_program_stack("MAIN.H:SUB1.H");
        assert_eq!(main.as_deref(), Some("MAIN.H"));
        assert_eq!(current.as_deref(), Some("SUB1.H"));
    }

    #[test]
    fn machine_number_selects_correct_marker() {
        assert_eq!(CompletionMarker::for_machine_number(2), CompletionMarker::BitMarker);
        assert_eq!(CompletionMarker::for_machine_number(7), CompletionMarker::WordMarker);
    }
}
