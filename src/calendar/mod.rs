//! Calendar & Shift Clock.
//!
//! Two calendars live here and are never unified: the **fixed** 06:00-22:00 / six-day
//! window the batch scheduler and dynamic rescheduler use (this module), and the
//! **configurable** [`ShiftTable`] the OEE engine uses to bucket live samples into
//! shifts.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Start of the fixed scheduling shift window (06:00 IST).
pub const SHIFT_START_HOUR: u32 = 6;
/// End of the fixed scheduling shift window (22:00 IST).
pub const SHIFT_END_HOUR: u32 = 22;

/// Offset of IST relative to UTC (+5:30), used only to *present* UTC instants in the
/// shop-floor's local wall clock. Nothing is ever stored in IST.
pub const IST_OFFSET_MINUTES: i64 = 5 * 60 + 30;

/// Projects a UTC instant into IST wall-clock time for scheduling math / display.
pub fn to_ist(utc: chrono::DateTime<chrono::Utc>) -> NaiveDateTime {
    utc.naive_utc() + Duration::minutes(IST_OFFSET_MINUTES)
}

/// Projects an IST wall-clock time back to UTC for storage.
pub fn from_ist(ist: NaiveDateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_naive_utc_and_offset(ist - Duration::minutes(IST_OFFSET_MINUTES), chrono::Utc)
}

/// True for Monday..Saturday; false only for Sunday, per spec.
pub fn is_working_day(t: NaiveDateTime) -> bool {
    t.weekday() != Weekday::Sun
}

/// `t` itself if it already falls on a working day; otherwise the earliest later
/// instant on a working day (same time-of-day, advanced a day at a time).
pub fn next_working_day(mut t: NaiveDateTime) -> NaiveDateTime {
    while !is_working_day(t) {
        t += Duration::days(1);
    }
    t
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    NaiveDateTime::new(date, NaiveTime::from_hms_opt(hour, 0, 0).expect("valid hour"))
}

/// 06:00 anchor on the working day containing `t`.
pub fn shift_start(t: NaiveDateTime) -> NaiveDateTime {
    at_hour(t.date(), SHIFT_START_HOUR)
}

/// 22:00 anchor on the working day containing `t`.
pub fn shift_end(t: NaiveDateTime) -> NaiveDateTime {
    at_hour(t.date(), SHIFT_END_HOUR)
}

/// Adjusts `t` into the fixed shift window, always composed with [`next_working_day`]:
/// - hour < 6  -> 06:00 the same (working) day
/// - hour >= 22 -> 06:00 the next working day
/// - otherwise -> `t` unchanged (after the working-day adjustment)
pub fn adjust_to_shift(t: NaiveDateTime) -> NaiveDateTime {
    let t = next_working_day(t);
    if t.hour() < SHIFT_START_HOUR {
        at_hour(t.date(), SHIFT_START_HOUR)
    } else if t.hour() >= SHIFT_END_HOUR {
        let next_day = next_working_day(t.date().succ_opt().expect("date in range").and_time(NaiveTime::MIN));
        at_hour(next_day.date(), SHIFT_START_HOUR)
    } else {
        t
    }
}

/// 06:00 on the next working day strictly after `t`.
pub fn next_shift_start(t: NaiveDateTime) -> NaiveDateTime {
    let next_day = if t.hour() < SHIFT_START_HOUR {
        t.date()
    } else {
        t.date().succ_opt().expect("date in range")
    };
    let next_day = next_working_day(next_day.and_time(NaiveTime::MIN));
    at_hour(next_day.date(), SHIFT_START_HOUR)
}

use chrono::Timelike;

/// A configurable, contiguous, non-overlapping set of shift windows covering 24h,
/// independent of the fixed 06:00-22:00 scheduler window. Windows may cross midnight.
#[derive(Debug, Clone)]
pub struct ShiftTable {
    /// (shift_id, start_time_of_day, end_time_of_day), ordered.
    pub shifts: Vec<(String, NaiveTime, NaiveTime)>,
}

impl ShiftTable {
    /// The conventional three 8h shifts: 06:00-14:00, 14:00-22:00, 22:00-06:00.
    pub fn three_shift_default() -> Self {
        ShiftTable {
            shifts: vec![
                ("shift_1".to_string(), NaiveTime::from_hms_opt(6, 0, 0).unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
                ("shift_2".to_string(), NaiveTime::from_hms_opt(14, 0, 0).unwrap(), NaiveTime::from_hms_opt(22, 0, 0).unwrap()),
                ("shift_3".to_string(), NaiveTime::from_hms_opt(22, 0, 0).unwrap(), NaiveTime::from_hms_opt(6, 0, 0).unwrap()),
            ],
        }
    }

    /// Finds the shift whose window covers `now`, returning
    /// (shift_id, shift_start_datetime, shift_end_datetime). If the shift crosses
    /// midnight the end date is adjusted by +1 day.
    pub fn shift_covering(&self, now: NaiveDateTime) -> Option<(String, NaiveDateTime, NaiveDateTime)> {
        let time_of_day = now.time();
        for (id, start, end) in &self.shifts {
            let crosses_midnight = end <= start;
            let covers = if crosses_midnight { time_of_day >= *start || time_of_day < *end } else { time_of_day >= *start && time_of_day < *end };
            if !covers {
                continue;
            }

            let (start_date, end_date) = if crosses_midnight {
                if time_of_day >= *start {
                    (now.date(), now.date().succ_opt().expect("date in range"))
                } else {
                    (now.date().pred_opt().expect("date in range"), now.date())
                }
            } else {
                (now.date(), now.date())
            };

            return Some((id.clone(), NaiveDateTime::new(start_date, *start), NaiveDateTime::new(end_date, *end)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn sunday_is_not_a_working_day() {
        // 2026-07-26 is a Sunday.
        assert!(!is_working_day(dt(2026, 7, 26, 10, 0)));
        assert!(is_working_day(dt(2026, 7, 27, 10, 0)));
    }

    #[test]
    fn adjust_to_shift_pulls_sunday_activation_to_monday_six_am() {
        let sunday_morning = dt(2026, 7, 26, 10, 0);
        let adjusted = adjust_to_shift(sunday_morning);
        assert_eq!(adjusted, dt(2026, 7, 27, 6, 0));
    }

    #[test]
    fn adjust_to_shift_before_six_moves_to_six_same_day() {
        let early = dt(2026, 7, 27, 3, 0);
        assert_eq!(adjust_to_shift(early), dt(2026, 7, 27, 6, 0));
    }

    #[test]
    fn adjust_to_shift_after_ten_pm_moves_to_next_working_day() {
        let late = dt(2026, 7, 27, 23, 0);
        assert_eq!(adjust_to_shift(late), dt(2026, 7, 28, 6, 0));
    }

    #[test]
    fn adjust_to_shift_skips_sunday_when_rolling_over() {
        // Saturday 23:00 should roll to Monday 06:00, skipping Sunday.
        let saturday_late = dt(2026, 8, 1, 23, 0);
        assert_eq!(adjust_to_shift(saturday_late), dt(2026, 8, 3, 6, 0));
    }

    #[test]
    fn next_shift_start_is_strictly_after_now() {
        let mid_shift = dt(2026, 7, 27, 12, 0);
        assert_eq!(next_shift_start(mid_shift), dt(2026, 7, 28, 6, 0));
    }

    #[test]
    fn shift_table_finds_midnight_crossing_shift() {
        let table = ShiftTable::three_shift_default();
        let (id, start, end) = table.shift_covering(dt(2026, 7, 27, 23, 30)).unwrap();
        assert_eq!(id, "shift_3");
        assert_eq!(start, dt(2026, 7, 27, 22, 0));
        assert_eq!(end, dt(2026, 7, 28, 6, 0));
    }

    #[test]
    fn shift_table_finds_shift_after_midnight() {
        let table = ShiftTable::three_shift_default();
        let (id, start, end) = table.shift_covering(dt(2026, 7, 28, 2, 0)).unwrap();
        assert_eq!(id, "shift_3");
        assert_eq!(start, dt(2026, 7, 27, 22, 0));
        assert_eq!(end, dt(2026, 7, 28, 6, 0));
    }
}
