//! Per-day totals by duty status.

use crate::models::duty_status::DutyStatus;
use crate::models::hours::Hours;
use crate::models::segment::DutyStatusSegment;
use crate::utils::date::DayBounds;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    pub off_duty: Hours,
    pub sleeper_berth: Hours,
    pub driving: Hours,
    pub on_duty_not_driving: Hours,
}

impl DailyTotals {
    pub fn get(&self, status: DutyStatus) -> Hours {
        match status {
            DutyStatus::OffDuty => self.off_duty,
            DutyStatus::SleeperBerth => self.sleeper_berth,
            DutyStatus::Driving => self.driving,
            DutyStatus::OnDutyNotDriving => self.on_duty_not_driving,
        }
    }

    fn slot(&mut self, status: DutyStatus) -> &mut Hours {
        match status {
            DutyStatus::OffDuty => &mut self.off_duty,
            DutyStatus::SleeperBerth => &mut self.sleeper_berth,
            DutyStatus::Driving => &mut self.driving,
            DutyStatus::OnDutyNotDriving => &mut self.on_duty_not_driving,
        }
    }

    /// Duty-window usage: driving plus on-duty-not-driving.
    pub fn duty(&self) -> Hours {
        self.driving + self.on_duty_not_driving
    }

    pub fn total(&self) -> Hours {
        self.off_duty + self.sleeper_berth + self.duty()
    }
}

/// Portion of `seg` that lies inside `bounds`, with an open segment
/// running until `min(now, day end)`.
pub fn clipped_duration(seg: &DutyStatusSegment, bounds: &DayBounds, now: DateTime<Utc>) -> Hours {
    let start = seg.start.max(bounds.start);
    let end = seg.end.unwrap_or_else(|| bounds.clamp(now)).min(bounds.end);
    if end <= start {
        return Hours::ZERO;
    }
    Hours::from_delta(end - start)
}

/// Sum the day's segments by status. Full recompute, no stored totals involved.
pub fn daily_totals(
    segments: &[DutyStatusSegment],
    bounds: &DayBounds,
    now: DateTime<Utc>,
) -> DailyTotals {
    let mut totals = DailyTotals::default();
    for seg in segments {
        *totals.slot(seg.status) += clipped_duration(seg, bounds, now);
    }
    totals
}

/// First and last odometer readings of the day (chronological) and the
/// miles between them.
pub fn odometer_span(segments: &[DutyStatusSegment]) -> (Option<i64>, Option<i64>, i64) {
    let mut sorted: Vec<&DutyStatusSegment> = segments.iter().collect();
    sorted.sort_by_key(|s| s.start);

    let mut readings = sorted.iter().filter_map(|s| s.odometer);
    let first = readings.next();
    let last = readings.last().or(first);

    let miles = match (first, last) {
        (Some(a), Some(b)) => (b - a).max(0),
        _ => 0,
    };
    (first, last, miles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::Location;
    use crate::utils::date::day_bounds;
    use chrono::{NaiveDate, Offset, TimeDelta, TimeZone};

    fn seg(status: DutyStatus, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> DutyStatusSegment {
        DutyStatusSegment {
            id: 0,
            log_id: 1,
            driver_id: 1,
            trip_id: None,
            status,
            start,
            end,
            location: Location::unknown(),
            remarks: String::new(),
            odometer: None,
            edit: None,
            created_at: start,
        }
    }

    #[test]
    fn open_segment_counts_until_now() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let bounds = day_bounds(date, Utc.fix());
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap();
        let segs = vec![
            seg(DutyStatus::Driving, t0, Some(t0 + TimeDelta::hours(2))),
            seg(DutyStatus::OffDuty, t0 + TimeDelta::hours(2), None),
        ];

        let at_2h = daily_totals(&segs, &bounds, t0 + TimeDelta::hours(2));
        assert_eq!(at_2h.driving, Hours::from_hours(2));
        assert_eq!(at_2h.off_duty, Hours::ZERO);

        let later = daily_totals(&segs, &bounds, t0 + TimeDelta::hours(3));
        assert_eq!(later.off_duty, Hours::from_hours(1));
    }

    #[test]
    fn open_segment_stops_at_day_end() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let bounds = day_bounds(date, Utc.fix());
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        let segs = vec![seg(DutyStatus::SleeperBerth, t0, None)];

        let totals = daily_totals(&segs, &bounds, t0 + TimeDelta::hours(30));
        assert_eq!(totals.sleeper_berth, Hours::from_hours(4));
    }
}
