//! CLI surface: `scheduler run`, `collector run --protocol=<opcua|lsv2|modbus>`,
//! `oee compute [--since T]`.

use crate::config::{AppConfig, StoreSeed};
use crate::error::{Error, Outcome};
use crate::store::Store;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vrm_rust_workflow", about = "Manufacturing execution and scheduling core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synchronous batch-schedule invocation.
    Scheduler {
        #[command(subcommand)]
        action: SchedulerAction,
    },
    /// Launches the corresponding device poller.
    Collector {
        #[command(subcommand)]
        action: CollectorAction,
    },
    /// Triggers C6 reconciliation for all machines.
    Oee {
        #[command(subcommand)]
        action: OeeAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SchedulerAction {
    Run {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        seed: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Protocol {
    Opcua,
    Lsv2,
    Modbus,
}

#[derive(Debug, Subcommand)]
pub enum CollectorAction {
    Run {
        #[arg(long)]
        protocol: Protocol,
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum OeeAction {
    Compute {
        #[arg(long, value_name = "RFC3339")]
        since: Option<String>,
        #[arg(long, value_name = "PATH")]
        seed: PathBuf,
        /// Supplies per-machine OEE denominators (`oee_denominators`); without
        /// it, availability falls back to the full shift length.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Runs the requested subcommand, returning the user-visible outcome the
/// binary's exit code is derived from.
pub async fn dispatch(cli: Cli) -> Outcome {
    match run(cli).await {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{err}");
            err.outcome()
        }
    }
}

async fn run(cli: Cli) -> crate::error::Result<Outcome> {
    match cli.command {
        Command::Scheduler { action: SchedulerAction::Run { config, seed } } => {
            let config = config.map(AppConfig::from_file).transpose()?.unwrap_or_default();
            let seed = StoreSeed::from_file(seed)?;
            let store = Store::new();
            seed.apply(&store);
            config.apply_oee_denominators(&store);
            let result = crate::scheduler::run(&store, &seed.quantity_request());
            for diagnostic in &result.diagnostics {
                eprintln!("{diagnostic}");
            }
            log::info!("scheduler run produced {} schedule records", result.records.len());
            Ok(Outcome::Ok)
        }
        Command::Collector { action: CollectorAction::Run { protocol, config } } => {
            let config = AppConfig::from_file(config)?;
            run_collector(protocol, config).await
        }
        Command::Oee { action: OeeAction::Compute { since, seed, config } } => {
            let since = since.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&chrono::Utc)).map_err(|e| Error::Input(e.to_string()))).transpose()?.unwrap_or_else(chrono::Utc::now);
            let seed = StoreSeed::from_file(seed)?;
            let store = Store::new();
            seed.apply(&store);
            if let Some(config) = config.map(AppConfig::from_file).transpose()? {
                config.apply_oee_denominators(&store);
            }
            for machine in &seed.machines {
                crate::oee::update(&store, since, &machine.id);
            }
            log::info!("oee compute reconciled {} machines as of {}", seed.machines.len(), since);
            Ok(Outcome::Ok)
        }
    }
}

async fn run_collector(protocol: Protocol, config: AppConfig) -> crate::error::Result<Outcome> {
    use crate::status_engine::lsv2::{Lsv2RawReading, SimulatedLsv2Reader};
    use crate::status_engine::modbus::{EnergyThreshold, ModbusRawReading, SimulatedModbusReader};
    use crate::status_engine::opcua::{OpcUaRawReading, SimulatedOpcUaReader};
    use crate::status_engine::poller;
    use crate::status_engine::DeviceReader;
    use std::sync::Arc;
    use std::time::Duration;

    let store = Arc::new(Store::new());
    let mut handles = Vec::new();
    let mut cancels = Vec::new();

    match protocol {
        Protocol::Opcua => {
            for device in &config.opcua_devices {
                let reader: Box<dyn DeviceReader> = Box::new(SimulatedOpcUaReader::new(crate::model::MachineId::new(device.machine_id.clone()), vec![OpcUaRawReading { prog_status: "IDLE".into(), op_mode: "AUTO".into(), act_parts: 0, prog_name: None, selected_work_p_prog: None }]));
                let (handle, cancel) = poller::spawn(store.clone(), reader, Duration::from_secs(config.poll_intervals.opcua_seconds));
                handles.push(handle);
                cancels.push(cancel);
            }
        }
        Protocol::Lsv2 => {
            for device in &config.lsv2_devices {
                let marker = device.completion_marker();
                let reader: Box<dyn DeviceReader> = Box::new(SimulatedLsv2Reader::new(crate::model::MachineId::new(device.machine_id.clone()), marker, vec![Lsv2RawReading { program_status: "IDLE".into(), execution_state: "IDLE".into(), program_stack: String::new(), completion_marker_raw: 0 }]));
                let (handle, cancel) = poller::spawn(store.clone(), reader, Duration::from_secs(config.poll_intervals.lsv2_seconds));
                handles.push(handle);
                cancels.push(cancel);
            }
        }
        Protocol::Modbus => {
            for meter in &config.modbus_meters {
                let threshold = EnergyThreshold { power_threshold: meter.power_threshold };
                let reader: Box<dyn DeviceReader> = Box::new(SimulatedModbusReader::new(crate::model::MachineId::new(meter.machine_id.clone()), threshold, vec![ModbusRawReading { power: 0.0, frequency: 0.0 }]));
                let (handle, cancel) = poller::spawn(store.clone(), reader, Duration::from_secs(config.poll_intervals.modbus_seconds));
                handles.push(handle);
                cancels.push(cancel);
            }
        }
    }

    tokio::signal::ctrl_c().await.map_err(|e| Error::FatalIo(e.to_string()))?;
    for cancel in &cancels {
        let _ = cancel.send(true);
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(Outcome::Ok)
}
