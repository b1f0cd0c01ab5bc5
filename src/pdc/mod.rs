//! Promised Delivery Commit (PDC) projection: the latest end-time across an
//! order's schedule items, and whether it is backed by a reschedule, the
//! original plan, or neither.
//!
//! Reschedule output always takes precedence over the initial plan for the
//! same item. Results are cached by an explicit [`PdcCache`] carrying a TTL,
//! constructed and owned by the caller rather than held behind a `static`.

use crate::model::{Order, OrderId};
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdcStatus {
    Completed,
    InProgress,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Reschedule,
    Scheduled,
    None,
}

#[derive(Debug, Clone)]
pub struct PdcRow {
    pub part_number: String,
    pub production_order: String,
    pub pdc: Option<DateTime<Utc>>,
    pub status: PdcStatus,
    pub data_source: DataSource,
}

/// Explicit TTL cache keyed by (part_number, production_order), constructed by
/// the caller and passed by reference.
pub struct PdcCache {
    ttl: Duration,
    entries: HashMap<(String, String), (DateTime<Utc>, PdcRow)>,
}

impl PdcCache {
    pub fn new(ttl: Duration) -> Self {
        PdcCache { ttl, entries: HashMap::new() }
    }

    fn get_fresh(&self, key: &(String, String), now: DateTime<Utc>) -> Option<PdcRow> {
        self.entries.get(key).filter(|(cached_at, _)| now - *cached_at < self.ttl).map(|(_, row)| row.clone())
    }

    fn put(&mut self, key: (String, String), now: DateTime<Utc>, row: PdcRow) {
        self.entries.insert(key, (now, row));
    }

    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, (cached_at, _)| now - *cached_at < self.ttl);
    }
}

/// Projects the PDC row for `order_id`, using `cache` as a read-through cache.
pub fn project(store: &Store, cache: &mut PdcCache, order_id: &OrderId, now: DateTime<Utc>) -> Option<PdcRow> {
    let order = store.get_order(order_id)?;
    let key = order.key();

    if let Some(row) = cache.get_fresh(&key, now) {
        return Some(row);
    }

    let row = compute(store, &order);
    cache.put(key, now, row.clone());
    Some(row)
}

fn compute(store: &Store, order: &Order) -> PdcRow {
    let is_active = store.get_part_status(&order.production_order).map(|s| s.is_active()).unwrap_or(false);
    if !is_active {
        return PdcRow { part_number: order.part_number.clone(), production_order: order.production_order.clone(), pdc: None, status: PdcStatus::Pending, data_source: DataSource::None };
    }

    let items = store.items_for_order(&order.id);
    if items.is_empty() {
        return PdcRow { part_number: order.part_number.clone(), production_order: order.production_order.clone(), pdc: None, status: PdcStatus::Pending, data_source: DataSource::None };
    }

    // Step 1: max end_time across active ScheduleVersions and initial_end_time;
    // reschedule output (an active version past version 1) takes precedence.
    let mut pdc: Option<DateTime<Utc>> = None;
    let mut data_source = DataSource::None;
    let mut all_complete = true;

    for item in &items {
        let planned_quantity = store.logs_for_operation(&item.operation_id).iter().map(|l| l.quantity_completed as u32).sum::<u32>();
        if planned_quantity < item.total_quantity {
            all_complete = false;
        }

        let active_version = store.active_version(&item.id);
        let candidate_end = match &active_version {
            Some(v) => {
                data_source = DataSource::Reschedule;
                v.planned_end_time
            }
            None => {
                if data_source == DataSource::None {
                    data_source = DataSource::Scheduled;
                }
                item.initial_end_time
            }
        };
        pdc = Some(pdc.map_or(candidate_end, |current: DateTime<Utc>| current.max(candidate_end)));
    }

    let has_logs = items.iter().any(|i| !store.logs_for_operation(&i.operation_id).is_empty());
    let status = if all_complete {
        PdcStatus::Completed
    } else if has_logs {
        PdcStatus::InProgress
    } else {
        PdcStatus::Pending
    };

    PdcRow { part_number: order.part_number.clone(), production_order: order.production_order.clone(), pdc, status, data_source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::TimeZone;

    fn seeded_store() -> (Store, Order) {
        let store = Store::new();
        let order = Order { id: OrderId::new("o-1"), part_number: "P-1".into(), production_order: "PO-1".into(), required_quantity: 5, launched_quantity: 0, priority: 1, delivery_date: None, raw_material: None, project: None };
        store.put_order(order.clone());
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 2, 0, 0).unwrap();
        store.activate_part(&order.part_number, &order.production_order, now);
        (store, order)
    }

    #[test]
    fn pending_when_no_plan_exists() {
        let (store, order) = seeded_store();
        let mut cache = PdcCache::new(Duration::seconds(30));
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 2, 0, 0).unwrap();
        let row = project(&store, &mut cache, &order.id, now).unwrap();
        assert_eq!(row.status, PdcStatus::Pending);
        assert_eq!(row.data_source, DataSource::None);
    }

    #[test]
    fn cache_hit_returns_same_row_within_ttl() {
        let (store, order) = seeded_store();
        let mut cache = PdcCache::new(Duration::seconds(60));
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 2, 0, 0).unwrap();
        let first = project(&store, &mut cache, &order.id, now).unwrap();
        let second = project(&store, &mut cache, &order.id, now + Duration::seconds(10)).unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(cache.entries.len(), 1);
    }
}
