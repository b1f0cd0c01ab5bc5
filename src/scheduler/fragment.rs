//! Shift-boundary fragment splitting for setup and production intervals.
//! Operates purely in IST wall-clock time (`NaiveDateTime`); the caller
//! converts to/from UTC at the boundary via `calendar::to_ist`/`from_ist`.

use crate::calendar;
use chrono::{Duration, NaiveDateTime};

const EPS_MINUTES: f64 = 1e-6;

fn add_minutes(t: NaiveDateTime, minutes: f64) -> NaiveDateTime {
    t + Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// One shift-bounded fragment of an emitted interval.
#[derive(Debug, Clone)]
pub struct TimeFragment {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: String,
}

/// Splits a setup interval of `total_minutes` starting at `cursor` across shift
/// boundaries. Returns the emitted fragments and the cursor positioned at the
/// end of the last fragment.
pub fn split_setup(cursor: NaiveDateTime, total_minutes: f64) -> (Vec<TimeFragment>, NaiveDateTime) {
    let mut fragments = Vec::new();
    if total_minutes <= EPS_MINUTES {
        let cur = calendar::adjust_to_shift(cursor);
        return (fragments, cur);
    }

    let mut cur = calendar::adjust_to_shift(cursor);
    let mut remaining = total_minutes;
    let mut done = 0.0;

    loop {
        let shift_end = calendar::shift_end(cur);
        let available = minutes_between(cur, shift_end).max(0.0);
        let fragment_minutes = remaining.min(available);
        let frag_end = add_minutes(cur, fragment_minutes);
        done += fragment_minutes;
        fragments.push(TimeFragment { start: cur, end: frag_end, label: format!("Setup({:.0}/{:.0}min)", done, total_minutes) });
        remaining -= fragment_minutes;
        if remaining <= EPS_MINUTES {
            cur = frag_end;
            break;
        }
        cur = calendar::next_shift_start(shift_end);
    }
    (fragments, cur)
}

/// Splits a production interval of `quantity` pieces at `cycle_minutes` each
/// across shift boundaries. `pieces_in_fragment =
/// max(1, floor(remaining_pieces * fragment_minutes / remaining_minutes))`
/// capped at `remaining_pieces`; the final fragment absorbs any leftover so that
/// Σ pieces == quantity exactly.
pub fn split_production(cursor: NaiveDateTime, quantity: u32, cycle_minutes: f64) -> (Vec<TimeFragment>, NaiveDateTime) {
    let mut fragments = Vec::new();
    if quantity == 0 {
        let cur = calendar::adjust_to_shift(cursor);
        return (fragments, cur);
    }

    let total_minutes = quantity as f64 * cycle_minutes;
    let mut cur = calendar::adjust_to_shift(cursor);
    let mut remaining_minutes = total_minutes;
    let mut remaining_pieces = quantity;
    let mut completed = 0u32;

    loop {
        let shift_end = calendar::shift_end(cur);
        let available = minutes_between(cur, shift_end).max(0.0);
        let fragment_minutes = remaining_minutes.min(available);
        let is_last = fragment_minutes >= remaining_minutes - EPS_MINUTES;

        let pieces_in_fragment = if is_last {
            remaining_pieces
        } else {
            let ratio = if remaining_minutes > EPS_MINUTES { fragment_minutes / remaining_minutes } else { 1.0 };
            let raw = (remaining_pieces as f64 * ratio).floor() as u32;
            raw.max(1).min(remaining_pieces)
        };

        completed += pieces_in_fragment;
        let frag_end = add_minutes(cur, fragment_minutes);
        fragments.push(TimeFragment { start: cur, end: frag_end, label: format!("Process({completed}/{quantity}pcs)") });

        remaining_minutes -= fragment_minutes;
        remaining_pieces -= pieces_in_fragment;

        if remaining_minutes <= EPS_MINUTES || remaining_pieces == 0 {
            cur = frag_end;
            break;
        }
        cur = calendar::next_shift_start(shift_end);
    }
    (fragments, cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ist(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn setup_within_shift_emits_one_fragment() {
        let cursor = ist(2026, 7, 27, 8, 0); // Monday
        let (fragments, cur) = split_setup(cursor, 30.0);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].label, "Setup(30/30min)");
        assert_eq!(cur, ist(2026, 7, 27, 8, 30));
    }

    #[test]
    fn setup_crossing_shift_end_splits_and_skips_sunday() {
        // Saturday 21:30, 90 minutes of setup: 30 min fit before 22:00, the rest
        // rolls to the next working day (Monday, Sunday is skipped) at 06:00.
        let cursor = ist(2026, 7, 25, 21, 30); // Saturday
        let (fragments, cur) = split_setup(cursor, 90.0);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].end, ist(2026, 7, 25, 22, 0));
        assert_eq!(fragments[1].start, ist(2026, 7, 27, 6, 0)); // Monday
        assert_eq!(cur, ist(2026, 7, 27, 6, 30));
    }

    #[test]
    fn production_pieces_sum_to_quantity_across_shift_split() {
        // 10 pieces * 120 min each = 1200 min total; shift has only 120 min left.
        let cursor = ist(2026, 7, 27, 20, 0);
        let (fragments, _cur) = split_production(cursor, 10, 120.0);
        assert!(fragments.len() >= 2);
        assert_eq!(fragments.last().unwrap().label, "Process(10/10pcs)");
    }

    #[test]
    fn zero_quantity_emits_no_fragments() {
        let cursor = ist(2026, 7, 27, 8, 0);
        let (fragments, cur) = split_production(cursor, 0, 5.0);
        assert!(fragments.is_empty());
        assert_eq!(cur, cursor);
    }
}
