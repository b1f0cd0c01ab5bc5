//! Data Model: the semantic entities of the scheduling and status domain.

pub mod id;
pub mod order;
pub mod part_status;
pub mod production_log;
pub mod schedule;
pub mod shift;
pub mod status;

pub use id::{DowntimeId, MachineId, OperationId, OrderId, ProductionLogId, ScheduleItemId, WorkCenterId};
pub use order::{Machine, Operation, Order, WorkCenter, DEFAULT_CYCLE_MINUTES, DEFAULT_SETUP_MINUTES};
pub use part_status::{ActivationState, PartScheduleStatus};
pub use production_log::ProductionLog;
pub use schedule::{ItemStatus, PlannedScheduleItem, ScheduleDedupKey, ScheduleRecord, ScheduleVersion};
pub use shift::{ConfigInfo, ShiftSummary};
pub use status::{MachineDowntime, MachineRaw, MachineRawLive, Status};
