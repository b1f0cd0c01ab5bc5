//! Per-device poller task: one cooperative `tokio` task per device, a
//! per-read deadline that treats a timeout as disconnection, and cooperative
//! cancellation via a `watch<bool>`.

use super::{apply_sample, DeviceReader, DeviceSample};
use crate::model::Status;
use crate::store::Store;
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Reconnect backoff after a failed or timed-out read. While backing off, the
/// poller does not attempt another read and records no samples; it only
/// resumes polling once this much time has elapsed since the failure.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Per-read deadline; a timeout is treated as a disconnection.
pub const READ_DEADLINE: Duration = Duration::from_secs(1);

/// Sleeps for `dur` or until `cancel` reports `true`, whichever comes first.
/// Returns `true` if cancellation was observed.
async fn sleep_or_cancelled(dur: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(dur) => false,
        _ = cancel.changed() => *cancel.borrow(),
    }
}

/// Runs `reader`'s poll loop at `poll_interval` until `cancel` reports `true`,
/// writing every sample through [`apply_sample`]. A failed or timed-out read
/// writes one OFF sample for the transition, then backs off for
/// [`RECONNECT_BACKOFF`] before the next read attempt. On cancellation,
/// flushes a final OFF record.
pub async fn run(store: Arc<Store>, mut reader: Box<dyn DeviceReader>, poll_interval: Duration, mut cancel: watch::Receiver<bool>) {
    let machine_id = reader.machine_id().clone();
    loop {
        if *cancel.borrow() {
            break;
        }

        let outcome = tokio::time::timeout(READ_DEADLINE, reader.read_sample()).await;
        let failed = !matches!(outcome, Ok(Ok(_)));
        let sample = match outcome {
            Ok(Ok(sample)) => sample,
            Ok(Err(err)) => {
                warn!("{machine_id}: read error, treating as OFF and backing off for {RECONNECT_BACKOFF:?}: {err}");
                DeviceSample { timestamp: Utc::now(), status: Status::Off, op_mode: None, selected_program: None, active_program: None, part_count: store.get_live(&machine_id).map(|l| l.part_count).unwrap_or(0) }
            }
            Err(_) => {
                warn!("{machine_id}: read timed out after {READ_DEADLINE:?}, treating as OFF and backing off for {RECONNECT_BACKOFF:?}");
                DeviceSample { timestamp: Utc::now(), status: Status::Off, op_mode: None, selected_program: None, active_program: None, part_count: store.get_live(&machine_id).map(|l| l.part_count).unwrap_or(0) }
            }
        };

        apply_sample(&store, &machine_id, sample);

        if failed {
            if sleep_or_cancelled(RECONNECT_BACKOFF, &mut cancel).await {
                break;
            }
            continue;
        }

        if sleep_or_cancelled(poll_interval, &mut cancel).await {
            break;
        }
    }

    info!("{machine_id}: poller cancelled, flushing final OFF record");
    super::flush_shutdown(&store, &machine_id, Utc::now());
}

/// Spawns [`run`] as a detached task, returning the cancellation sender the
/// caller uses to shut the poller down.
pub fn spawn(store: Arc<Store>, reader: Box<dyn DeviceReader>, poll_interval: Duration) -> (tokio::task::JoinHandle<()>, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        run(store, reader, poll_interval, rx).await;
    });
    (handle, tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_engine::opcua::{OpcUaRawReading, SimulatedOpcUaReader};
    use crate::model::MachineId;

    #[tokio::test]
    async fn poller_flushes_off_record_on_cancel() {
        let store = Arc::new(Store::new());
        let machine_id = MachineId::new("m-1");
        let readings = vec![OpcUaRawReading { prog_status: "RUNNING".into(), op_mode: "AUTO".into(), act_parts: 1, prog_name: None, selected_work_p_prog: None }; 50];
        let reader: Box<dyn DeviceReader> = Box::new(SimulatedOpcUaReader::new(machine_id.clone(), readings));

        let (handle, cancel_tx) = spawn(store.clone(), reader, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        let live = store.get_live(&machine_id).expect("live row written");
        assert_eq!(live.status, Status::Off);
    }

    struct AlwaysFailingReader {
        machine_id: MachineId,
        attempts: Arc<std::sync::atomic::AtomicU32>,
    }

    #[async_trait::async_trait]
    impl DeviceReader for AlwaysFailingReader {
        async fn read_sample(&mut self) -> crate::error::Result<DeviceSample> {
            self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(crate::error::Error::TransientIo("simulated disconnect".into()))
        }

        fn machine_id(&self) -> &MachineId {
            &self.machine_id
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_backs_off_instead_of_busy_polling() {
        let store = Arc::new(Store::new());
        let machine_id = MachineId::new("m-1");
        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let reader: Box<dyn DeviceReader> = Box::new(AlwaysFailingReader { machine_id: machine_id.clone(), attempts: attempts.clone() });

        let (handle, cancel_tx) = spawn(store.clone(), reader, Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(5)).await;
        assert_eq!(store.get_live(&machine_id).expect("live row written").status, Status::Off);
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1, "only the failing attempt itself should have run so far");

        // Still inside the backoff window: no further read attempt yet.
        tokio::time::advance(RECONNECT_BACKOFF - Duration::from_secs(1)).await;
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1, "must not retry before RECONNECT_BACKOFF elapses");

        // Past the backoff window: the next read attempt has landed.
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(attempts.load(std::sync::atomic::Ordering::SeqCst) >= 2, "must retry once RECONNECT_BACKOFF has elapsed");

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
