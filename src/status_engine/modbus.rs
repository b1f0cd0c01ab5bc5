//! Modbus RTU energy-meter reader: 9600-7-E-2 ASCII mode, per-meter register
//! map loaded from configuration. Serial bus transport is out of scope. The
//! bus itself is a single shared resource: callers serialize reads across
//! meters on one poller task rather than modeling one task per meter.

use super::{DeviceReader, DeviceSample};
use crate::error::{Error, Result};
use crate::model::{MachineId, Status};
use async_trait::async_trait;
use chrono::Utc;

#[derive(Debug, Clone, Copy)]
pub struct ModbusRawReading {
    pub power: f64,
    pub frequency: f64,
}

/// Per-machine threshold loaded from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EnergyThreshold {
    pub power_threshold: f64,
}

/// |power| over threshold classifies as Production; within threshold but
/// frequency > 0 classifies as Idle; otherwise Off.
pub fn classify(reading: &ModbusRawReading, threshold: &EnergyThreshold) -> Status {
    if reading.power.abs() > threshold.power_threshold {
        Status::Production
    } else if reading.frequency > 0.0 {
        Status::Idle
    } else {
        Status::Off
    }
}

pub struct SimulatedModbusReader {
    machine_id: MachineId,
    threshold: EnergyThreshold,
    readings: std::vec::IntoIter<ModbusRawReading>,
}

impl SimulatedModbusReader {
    pub fn new(machine_id: MachineId, threshold: EnergyThreshold, readings: Vec<ModbusRawReading>) -> Self {
        SimulatedModbusReader { machine_id, threshold, readings: readings.into_iter() }
    }
}

#[async_trait]
impl DeviceReader for SimulatedModbusReader {
    async fn read_sample(&mut self) -> Result<DeviceSample> {
        let reading = self.readings.next().ok_or_else(|| Error::TransientIo("no more simulated readings".into()))?;
        let status = classify(&reading, &self.threshold);
        // Energy meters carry no part counter of their own.
        Ok(DeviceSample { timestamp: Utc::now(), status, op_mode: None, selected_program: None, active_program: None, part_count: 0 })
    }

    fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_above_threshold_is_production() {
        let threshold = EnergyThreshold { power_threshold: 2.0 };
        assert_eq!(classify(&ModbusRawReading { power: 5.0, frequency: 50.0 }, &threshold), Status::Production);
    }

    #[test]
    fn power_within_threshold_but_live_frequency_is_idle() {
        let threshold = EnergyThreshold { power_threshold: 2.0 };
        assert_eq!(classify(&ModbusRawReading { power: 0.2, frequency: 50.0 }, &threshold), Status::Idle);
    }

    #[test]
    fn zero_power_and_frequency_is_off() {
        let threshold = EnergyThreshold { power_threshold: 2.0 };
        assert_eq!(classify(&ModbusRawReading { power: 0.0, frequency: 0.0 }, &threshold), Status::Off);
    }
}
