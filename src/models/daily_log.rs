use super::hours::Hours;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One record per (driver, calendar date).
///
/// The four category totals and `cycle_used` are a cache of the last full
/// recompute from the day's segments; they are always re-derivable and are
/// never trusted over the segments themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLog {
    pub id: i64,
    pub driver_id: i64,
    pub date: NaiveDate,
    pub vehicle_number: String,

    pub off_duty: Hours,
    pub sleeper_berth: Hours,
    pub driving: Hours,
    pub on_duty_not_driving: Hours,

    pub cycle_used: Hours,
    /// Schedule ceiling (60h or 70h) frozen when the log was created.
    pub cycle_ceiling: Hours,

    pub odometer_start: Option<i64>,
    pub odometer_end: Option<i64>,
    pub total_miles: i64,

    pub has_violations: bool,
    pub violation_notes: String,

    pub certified: bool,
    pub certified_at: Option<DateTime<Utc>>,
    pub signature: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyLog {
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Driving plus on-duty-not-driving.
    pub fn duty_total(&self) -> Hours {
        self.driving + self.on_duty_not_driving
    }

    pub fn cycle_available(&self) -> Hours {
        self.cycle_ceiling.saturating_sub(self.cycle_used)
    }
}
