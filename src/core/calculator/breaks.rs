//! 30-minute break after 8 hours of driving.

use super::totals::clipped_duration;
use crate::models::duty_status::DutyStatus;
use crate::models::hours::Hours;
use crate::models::segment::DutyStatusSegment;
use crate::utils::date::DayBounds;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakStatus {
    pub required: bool,
    /// Driving accumulated since the last qualifying break.
    pub driving_since_break: Hours,
}

impl BreakStatus {
    pub fn minutes_since_break(&self) -> i64 {
        self.driving_since_break.minutes()
    }
}

/// Scan the day's segments in start order. Driving accumulates; an off-duty
/// or sleeper segment of at least `break_len` resets the counter.
pub fn break_status(
    segments: &[DutyStatusSegment],
    bounds: &DayBounds,
    now: DateTime<Utc>,
    break_after: Hours,
    break_len: Hours,
) -> BreakStatus {
    let mut sorted: Vec<&DutyStatusSegment> = segments.iter().collect();
    sorted.sort_by_key(|s| s.start);

    let mut since_break = Hours::ZERO;
    for seg in sorted {
        let dur = clipped_duration(seg, bounds, now);
        match seg.status {
            DutyStatus::Driving => since_break += dur,
            DutyStatus::OffDuty | DutyStatus::SleeperBerth if dur >= break_len => {
                since_break = Hours::ZERO
            }
            _ => {}
        }
    }

    BreakStatus {
        required: since_break >= break_after,
        driving_since_break: since_break,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::Location;
    use crate::utils::date::day_bounds;
    use chrono::{NaiveDate, Offset, TimeDelta, TimeZone};

    fn seg(status: DutyStatus, start: DateTime<Utc>, mins: i64) -> DutyStatusSegment {
        DutyStatusSegment {
            id: 0,
            log_id: 1,
            driver_id: 1,
            trip_id: None,
            status,
            start,
            end: Some(start + TimeDelta::minutes(mins)),
            location: Location::unknown(),
            remarks: String::new(),
            odometer: None,
            edit: None,
            created_at: start,
        }
    }

    fn bounds() -> DayBounds {
        day_bounds(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), Utc.fix())
    }

    #[test]
    fn short_stop_does_not_reset() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 5, 0, 0).unwrap();
        let segs = vec![
            seg(DutyStatus::Driving, t0, 300),
            seg(DutyStatus::OffDuty, t0 + TimeDelta::minutes(300), 20),
            seg(DutyStatus::Driving, t0 + TimeDelta::minutes(320), 210),
        ];
        let now = t0 + TimeDelta::hours(12);

        let st = break_status(&segs, &bounds(), now, Hours::from_hours(8), Hours::from_minutes(30));
        assert!(st.required);
        assert_eq!(st.minutes_since_break(), 510);
    }

    #[test]
    fn thirty_minute_sleeper_resets() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 5, 0, 0).unwrap();
        let segs = vec![
            seg(DutyStatus::Driving, t0, 300),
            seg(DutyStatus::SleeperBerth, t0 + TimeDelta::minutes(300), 30),
            seg(DutyStatus::Driving, t0 + TimeDelta::minutes(330), 210),
        ];
        let now = t0 + TimeDelta::hours(12);

        let st = break_status(&segs, &bounds(), now, Hours::from_hours(8), Hours::from_minutes(30));
        assert!(!st.required);
        assert_eq!(st.driving_since_break, Hours::from_minutes(210));
    }
}
