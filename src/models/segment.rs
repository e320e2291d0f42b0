use super::{duty_status::DutyStatus, hours::Hours, location::Location};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who corrected a segment after the fact, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditInfo {
    pub edited_by: String,
    pub reason: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DutyStatusSegment {
    pub id: i64,
    pub log_id: i64,                      // ⇔ duty_segments.log_id
    pub driver_id: i64,                   // ⇔ duty_segments.driver_id (denormalized)
    pub trip_id: Option<i64>,             // ⇔ duty_segments.trip_id (nullable)
    pub status: DutyStatus,               // ⇔ duty_segments.status
    pub start: DateTime<Utc>,             // ⇔ duty_segments.start_time (RFC 3339, Z)
    pub end: Option<DateTime<Utc>>,       // ⇔ duty_segments.end_time (NULL = active)
    pub location: Location,               // ⇔ location, latitude, longitude
    pub remarks: String,                  // ⇔ duty_segments.remarks
    pub odometer: Option<i64>,            // ⇔ duty_segments.odometer
    pub edit: Option<EditInfo>,           // ⇔ is_edited, edited_by, edit_reason, edited_at
    pub created_at: DateTime<Utc>,
}

impl DutyStatusSegment {
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Duration up to `end`, or up to `until` for the active segment.
    /// Never negative.
    pub fn duration_until(&self, until: DateTime<Utc>) -> Hours {
        let end = self.end.unwrap_or(until);
        Hours::from_delta(end - self.start).clamp_non_negative()
    }

    /// Half-open interval overlap test; an active segment extends forever.
    pub fn overlaps(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        let other_end_after_my_start = end.is_none_or(|e| e > self.start);
        let my_end_after_other_start = self.end.is_none_or(|e| e > start);
        other_end_after_my_start && my_end_after_other_start
    }
}

/// Values for a brand-new segment, before it has an id.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub log_id: i64,
    pub driver_id: i64,
    pub trip_id: Option<i64>,
    pub status: DutyStatus,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: Location,
    pub remarks: String,
    pub odometer: Option<i64>,
}
