//! Rolling 7/8-day cycle window.

use super::totals::DailyTotals;
use crate::models::hours::Hours;
use crate::models::schedule::CycleSchedule;
use chrono::{Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleTotals {
    pub as_of: NaiveDate,
    pub window_days: u32,
    pub used: Hours,
    pub ceiling: Hours,
    pub available: Hours,
}

/// First date of the window that ends at `as_of`.
pub fn window_start(as_of: NaiveDate, schedule: CycleSchedule) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(schedule.window_days() as u64 - 1))
        .unwrap_or(as_of)
}

/// Sum duty hours of the days inside the window ending at `as_of`.
/// Days outside the window are ignored, so callers may pass extra history.
pub fn cycle_totals(
    days: &[(NaiveDate, DailyTotals)],
    as_of: NaiveDate,
    schedule: CycleSchedule,
) -> CycleTotals {
    let first = window_start(as_of, schedule);
    let used: Hours = days
        .iter()
        .filter(|(d, _)| *d >= first && *d <= as_of)
        .map(|(_, t)| t.duty())
        .sum();
    let ceiling = schedule.ceiling();

    CycleTotals {
        as_of,
        window_days: schedule.window_days(),
        used,
        ceiling,
        available: ceiling.saturating_sub(used),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32, driving: i64) -> (NaiveDate, DailyTotals) {
        (
            NaiveDate::from_ymd_opt(2025, 3, d).unwrap(),
            DailyTotals {
                driving: Hours::from_hours(driving),
                ..DailyTotals::default()
            },
        )
    }

    #[test]
    fn eight_day_window_excludes_ninth_day() {
        let days: Vec<_> = (1..=9).map(|d| day(d, 8)).collect();
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();

        let t = cycle_totals(&days, as_of, CycleSchedule::EightDay);
        assert_eq!(t.used, Hours::from_hours(64));
        assert_eq!(t.available, Hours::from_hours(6));

        let t7 = cycle_totals(&days, as_of, CycleSchedule::SevenDay);
        assert_eq!(t7.used, Hours::from_hours(56));
        assert_eq!(t7.available, Hours::from_hours(4));
    }

    #[test]
    fn available_never_negative() {
        let days: Vec<_> = (1..=8).map(|d| day(d, 10)).collect();
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let t = cycle_totals(&days, as_of, CycleSchedule::EightDay);
        assert_eq!(t.used, Hours::from_hours(80));
        assert_eq!(t.available, Hours::ZERO);
    }
}
