//! JSON configuration: one `config/*.json` file per concern (device
//! connections, poll intervals, OEE denominators). `serde`/`serde_json`
//! cover (de)serialization the same way they do for the rest of the crate.

use crate::error::Result;
use crate::status_engine::lsv2::CompletionMarker;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpcUaDeviceConfig {
    pub machine_id: String,
    pub ip_address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lsv2DeviceConfig {
    pub machine_id: String,
    pub host: String,
    pub port: u16,
    /// 1-based machine number, used to select the PLC completion marker:
    /// M4170 for machines 1,2,5; DWORD 2592 otherwise.
    pub machine_number: u32,
}

impl Lsv2DeviceConfig {
    pub fn completion_marker(&self) -> CompletionMarker {
        CompletionMarker::for_machine_number(self.machine_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusMeterConfig {
    pub machine_id: String,
    pub serial_port: String,
    pub unit_id: u8,
    pub power_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollIntervals {
    #[serde(default = "default_device_poll_seconds")]
    pub opcua_seconds: u64,
    #[serde(default = "default_device_poll_seconds")]
    pub lsv2_seconds: u64,
    #[serde(default = "default_energy_poll_seconds")]
    pub modbus_seconds: u64,
}

fn default_device_poll_seconds() -> u64 {
    1
}
fn default_energy_poll_seconds() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub opcua_devices: Vec<OpcUaDeviceConfig>,
    #[serde(default)]
    pub lsv2_devices: Vec<Lsv2DeviceConfig>,
    #[serde(default)]
    pub modbus_meters: Vec<ModbusMeterConfig>,
    #[serde(default)]
    pub poll_intervals: PollIntervals,
    /// Per-machine OEE denominators, keyed by machine_id.
    #[serde(default)]
    pub oee_denominators: Vec<crate::model::ConfigInfo>,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Loads each `oee_denominators` entry into the store's `ConfigInfo` table so
    /// the OEE engine's availability calculation uses the configured
    /// planned-downtime/non-production minutes instead of defaulting to the full
    /// shift length.
    pub fn apply_oee_denominators(&self, store: &crate::store::Store) {
        for config in &self.oee_denominators {
            store.put_config_info(config.clone());
        }
    }
}

/// A one-shot seed for the in-memory `Store` (the persistence interface has no
/// concrete DB binding in this rewrite — see DESIGN.md). Used by `scheduler run`
/// to prime orders/operations/machines before scheduling, since `InMemoryStore`
/// starts empty on every process launch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSeed {
    #[serde(default)]
    pub work_centers: Vec<crate::model::WorkCenter>,
    #[serde(default)]
    pub machines: Vec<crate::model::Machine>,
    #[serde(default)]
    pub orders: Vec<crate::model::Order>,
    #[serde(default)]
    pub operations: Vec<crate::model::Operation>,
    /// (part_number, production_order, activation_timestamp) triples to activate
    /// before scheduling.
    #[serde(default)]
    pub active_parts: Vec<(String, String, chrono::DateTime<chrono::Utc>)>,
    /// Requested quantity per (part_number, production_order).
    #[serde(default)]
    pub requested_quantities: Vec<(String, String, u32)>,
}

impl StoreSeed {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn apply(&self, store: &crate::store::Store) {
        for wc in &self.work_centers {
            store.put_work_center(wc.clone());
        }
        for machine in &self.machines {
            store.put_machine(machine.clone());
        }
        for order in &self.orders {
            store.put_order(order.clone());
        }
        for op in &self.operations {
            store.put_operation(op.clone());
        }
        for (part_number, production_order, at) in &self.active_parts {
            store.activate_part(part_number, production_order, *at);
        }
    }

    pub fn quantity_request(&self) -> crate::scheduler::QuantityRequest {
        self.requested_quantities.iter().map(|(p, po, q)| ((p.clone(), po.clone()), *q)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_json() {
        let json = r#"{
            "opcua_devices": [{"machine_id": "m-1", "ip_address": "10.0.0.5", "port": 4840, "username": "u", "password": "p"}],
            "poll_intervals": {"opcua_seconds": 2, "lsv2_seconds": 1, "modbus_seconds": 5}
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.opcua_devices.len(), 1);
        assert_eq!(config.poll_intervals.opcua_seconds, 2);
    }
}
