//! Phantom-tagged identity newtype: callers cannot compare or mix up an
//! `Id<Order>` with an `Id<Machine>`, even though both wrap a plain `String`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    pub value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Id { value: value.into(), _marker: PhantomData }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T> Eq for Id<T> {}
impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}
impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.rsplit("::").next().unwrap_or(full_name);
        write!(f, "{}({:?})", clean_name, self.value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderTag;
#[derive(Debug, Clone, Copy)]
pub struct OperationTag;
#[derive(Debug, Clone, Copy)]
pub struct MachineTag;
#[derive(Debug, Clone, Copy)]
pub struct WorkCenterTag;
#[derive(Debug, Clone, Copy)]
pub struct ScheduleItemTag;
#[derive(Debug, Clone, Copy)]
pub struct ProductionLogTag;
#[derive(Debug, Clone, Copy)]
pub struct DowntimeTag;

pub type OrderId = Id<OrderTag>;
pub type OperationId = Id<OperationTag>;
pub type MachineId = Id<MachineTag>;
pub type WorkCenterId = Id<WorkCenterTag>;
pub type ScheduleItemId = Id<ScheduleItemTag>;
pub type ProductionLogId = Id<ProductionLogTag>;
pub type DowntimeId = Id<DowntimeTag>;
