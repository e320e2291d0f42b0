//! Duty status ledger: opening, closing and correcting segments.
//!
//! All functions take the connection of an already open write transaction
//! and never commit themselves.

use crate::core::calculator::cycle::window_start;
use crate::core::calculator::totals::odometer_span;
use crate::core::calculator::{DailyTotals, cycle_totals, daily_totals};
use crate::db::queries::{
    active_segment, close_segment, ensure_log, find_log, latest_closed_end, load_log,
    load_segment, logs_between, insert_segment, segments_between, segments_for_log, update_log_totals,
    update_segment,
};
use crate::errors::{AppError, AppResult};
use crate::models::daily_log::DailyLog;
use crate::models::driver::Driver;
use crate::models::duty_status::DutyStatus;
use crate::models::location::Location;
use crate::models::segment::{DutyStatusSegment, EditInfo, NewSegment};
use crate::utils::date::{dates_between, day_bounds, local_date, to_db_ts, whole_seconds};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rusqlite::Connection;

/// A requested duty status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: DutyStatus,
    pub location: Location,
    pub remarks: String,
    pub odometer: Option<i64>,
    /// Defaults to the engine clock.
    pub occurs_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn new(status: DutyStatus, location: &str) -> Self {
        Self {
            status,
            location: Location::new(location),
            remarks: String::new(),
            odometer: None,
            occurs_at: None,
        }
    }

    /// Same as [`StatusChange::new`] but from a raw status string.
    pub fn parse(status: &str, location: &str) -> AppResult<Self> {
        Ok(Self::new(status.parse()?, location))
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = self.location.with_coordinates(latitude, longitude);
        self
    }

    pub fn with_remarks(mut self, remarks: &str) -> Self {
        self.remarks = remarks.to_string();
        self
    }

    pub fn with_odometer(mut self, odometer: i64) -> Self {
        self.odometer = Some(odometer);
        self
    }

    pub fn at(mut self, occurs_at: DateTime<Utc>) -> Self {
        self.occurs_at = Some(occurs_at);
        self
    }
}

/// Field corrections for [`LedgerLogic::amend_segment`]; `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct SegmentAmendment {
    pub status: Option<DutyStatus>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub remarks: Option<String>,
    pub odometer: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct LedgerChange {
    /// The newly opened segment.
    pub segment: DutyStatusSegment,
    /// The segment that was active before, as closed.
    pub closed: Option<DutyStatusSegment>,
    /// Log owning the new segment, before recompute.
    pub log: DailyLog,
    /// Every log that gained or changed a segment, oldest first.
    pub touched_logs: Vec<i64>,
}

pub struct LedgerLogic;

fn close_or_conflict(conn: &Connection, id: i64, end: DateTime<Utc>) -> AppResult<()> {
    if close_segment(conn, id, end)? {
        Ok(())
    } else {
        Err(AppError::Conflict(id))
    }
}

impl LedgerLogic {
    /// Close the active segment and open a new one at `occurs_at`.
    ///
    /// When the change falls on a later calendar day than the active
    /// segment, the active segment is closed at its own midnight and
    /// continued day by day, so no segment crosses a log boundary.
    pub fn change_status(
        conn: &Connection,
        driver: &Driver,
        change: &StatusChange,
        trip_id: Option<i64>,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerChange> {
        let at = whole_seconds(change.occurs_at.unwrap_or(now));
        if at > now {
            return Err(AppError::InvalidTimestamp(format!(
                "{} is in the future",
                to_db_ts(at)
            )));
        }

        if let Some(latest) = latest_closed_end(conn, driver.id)?
            && at < latest
        {
            return Err(AppError::InvalidTimestamp(format!(
                "{} precedes the end of an existing segment ({})",
                to_db_ts(at),
                to_db_ts(latest)
            )));
        }

        let active = active_segment(conn, driver.id)?;
        if let Some(a) = &active
            && at <= a.start
        {
            return Err(AppError::InvalidTimestamp(format!(
                "{} does not follow the start of the active segment ({})",
                to_db_ts(at),
                to_db_ts(a.start)
            )));
        }

        let target_date = local_date(at, offset);
        let mut touched = Vec::new();
        let mut closed = None;

        if let Some(a) = active {
            let a_log = load_log(conn, a.log_id)?;

            if a_log.date < target_date {
                let a_bounds = day_bounds(a_log.date, offset);
                close_or_conflict(conn, a.id, a_bounds.end)?;
                touched.push(a.log_id);

                let first = a_log.date.succ_opt().unwrap_or(target_date);
                for date in dates_between(first, target_date) {
                    let bounds = day_bounds(date, offset);
                    let end = if date == target_date { at } else { bounds.end };
                    if end <= bounds.start {
                        continue;
                    }

                    let log = ensure_log(conn, driver, date, now)?;
                    insert_segment(
                        conn,
                        &NewSegment {
                            log_id: log.id,
                            driver_id: driver.id,
                            trip_id: a.trip_id,
                            status: a.status,
                            start: bounds.start,
                            end: Some(end),
                            location: a.location.clone(),
                            remarks: a.remarks.clone(),
                            odometer: None,
                        },
                        now,
                    )?;
                    touched.push(log.id);
                }
            } else {
                close_or_conflict(conn, a.id, at)?;
                touched.push(a.log_id);
            }

            closed = load_segment(conn, a.id)?;
        }

        let log = ensure_log(conn, driver, target_date, now)?;
        let segment = insert_segment(
            conn,
            &NewSegment {
                log_id: log.id,
                driver_id: driver.id,
                trip_id,
                status: change.status,
                start: at,
                end: None,
                location: change.location.clone(),
                remarks: change.remarks.clone(),
                odometer: change.odometer,
            },
            now,
        )?;
        touched.push(log.id);
        touched.dedup();

        tracing::info!(
            driver = driver.id,
            status = %change.status,
            at = %to_db_ts(at),
            segment = segment.id,
            "duty status changed"
        );

        Ok(LedgerChange {
            segment,
            closed,
            log,
            touched_logs: touched,
        })
    }

    /// Correct a stored segment and stamp who did it and why.
    ///
    /// The corrected interval must stay inside its log's day and must not
    /// overlap any other segment of that log. An active segment keeps its
    /// open end; only a status change closes it.
    pub fn amend_segment(
        conn: &Connection,
        segment_id: i64,
        amendment: &SegmentAmendment,
        editor: &str,
        reason: &str,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<DutyStatusSegment> {
        let mut seg = load_segment(conn, segment_id)?.ok_or(AppError::SegmentNotFound(segment_id))?;
        let log = load_log(conn, seg.log_id)?;
        let bounds = day_bounds(log.date, offset);

        let start = amendment.start.map(whole_seconds).unwrap_or(seg.start);
        let end = match amendment.end.map(whole_seconds) {
            Some(_) if seg.is_active() => {
                return Err(AppError::InvalidTimestamp(format!(
                    "segment {} is active; it can only be closed by a status change",
                    seg.id
                )));
            }
            Some(e) => Some(e),
            None => seg.end,
        };

        if let Some(e) = end
            && e <= start
        {
            return Err(AppError::InvalidTimestamp(format!(
                "start {} must precede end {}",
                to_db_ts(start),
                to_db_ts(e)
            )));
        }

        if start < bounds.start || start >= bounds.end || end.is_some_and(|e| e > bounds.end) {
            return Err(AppError::InvalidTimestamp(format!(
                "interval falls outside the log day {}",
                log.date_str()
            )));
        }

        if end.is_none() && start > now {
            return Err(AppError::InvalidTimestamp(format!(
                "{} is in the future",
                to_db_ts(start)
            )));
        }

        for sibling in segments_for_log(conn, log.id)? {
            if sibling.id != seg.id && sibling.overlaps(start, end) {
                return Err(AppError::OverlappingInterval {
                    segment: seg.id,
                    sibling: sibling.id,
                });
            }
        }

        seg.start = start;
        seg.end = end;
        if let Some(status) = amendment.status {
            seg.status = status;
        }
        if let Some(location) = &amendment.location {
            seg.location = location.clone();
        }
        if let Some(remarks) = &amendment.remarks {
            seg.remarks = remarks.clone();
        }
        if amendment.odometer.is_some() {
            seg.odometer = amendment.odometer;
        }
        seg.edit = Some(EditInfo {
            edited_by: editor.to_string(),
            reason: reason.to_string(),
            edited_at: now,
        });

        update_segment(conn, &seg)?;
        tracing::info!(segment = seg.id, editor, "segment amended");
        Ok(seg)
    }

    /// Recompute a log's cached totals from its segments and persist them.
    pub fn recompute_log(
        conn: &Connection,
        driver: &Driver,
        log_id: i64,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<DailyLog> {
        let mut log = load_log(conn, log_id)?;
        let segments = segments_for_log(conn, log.id)?;
        let totals = daily_totals(&segments, &day_bounds(log.date, offset), now);

        let window = Self::totals_by_day(
            conn,
            driver.id,
            window_start(log.date, driver.schedule),
            log.date,
            offset,
            now,
        )?;
        let cycle = cycle_totals(&window, log.date, driver.schedule);
        let (odometer_start, odometer_end, total_miles) = odometer_span(&segments);

        log.off_duty = totals.off_duty;
        log.sleeper_berth = totals.sleeper_berth;
        log.driving = totals.driving;
        log.on_duty_not_driving = totals.on_duty_not_driving;
        log.cycle_used = cycle.used;
        log.odometer_start = odometer_start;
        log.odometer_end = odometer_end;
        log.total_miles = total_miles;
        log.updated_at = now;

        update_log_totals(conn, &log, now)?;
        tracing::debug!(
            log = log.id,
            date = %log.date,
            driving = %log.driving,
            duty = %log.duty_total(),
            cycle = %log.cycle_used,
            "daily log recomputed"
        );
        Ok(log)
    }

    /// The active segment when it was opened on a day before `date` and is
    /// still running once `date` has begun. No continuation segment exists
    /// for such a day until the next status change.
    pub fn carried_segment(
        conn: &Connection,
        driver_id: i64,
        date: NaiveDate,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DutyStatusSegment>> {
        let Some(active) = active_segment(conn, driver_id)? else {
            return Ok(None);
        };
        let opened_on = load_log(conn, active.log_id)?.date;
        Ok((opened_on < date && day_bounds(date, offset).start < now).then_some(active))
    }

    /// Segments counted toward `date`: the day's own log plus a carried
    /// active segment.
    pub fn day_segments(
        conn: &Connection,
        driver_id: i64,
        date: NaiveDate,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DutyStatusSegment>> {
        let mut segments = match find_log(conn, driver_id, date)? {
            Some(log) => segments_for_log(conn, log.id)?,
            None => Vec::new(),
        };
        segments.extend(Self::carried_segment(conn, driver_id, date, offset, now)?);
        Ok(segments)
    }

    /// Per-day totals for the driver dated `from..=to`: every stored log,
    /// plus the days an active segment has run into since it was opened.
    pub fn totals_by_day(
        conn: &Connection,
        driver_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<(NaiveDate, DailyTotals)>> {
        let logs = logs_between(conn, driver_id, from, to)?;
        let segments = segments_between(conn, driver_id, from, to)?;

        let mut days: Vec<(NaiveDate, Vec<DutyStatusSegment>)> = logs
            .iter()
            .map(|log| {
                let day = segments
                    .iter()
                    .filter(|s| s.log_id == log.id)
                    .cloned()
                    .collect();
                (log.date, day)
            })
            .collect();

        if let Some(active) = active_segment(conn, driver_id)? {
            let opened_on = load_log(conn, active.log_id)?.date;
            if let Some(next) = opened_on.succ_opt() {
                let last = to.min(local_date(now, offset));
                for date in dates_between(from.max(next), last) {
                    match days.iter_mut().find(|(d, _)| *d == date) {
                        Some((_, day)) => day.push(active.clone()),
                        None => days.push((date, vec![active.clone()])),
                    }
                }
            }
        }
        days.sort_by_key(|(d, _)| *d);

        Ok(days
            .into_iter()
            .map(|(date, day)| (date, daily_totals(&day, &day_bounds(date, offset), now)))
            .collect())
    }
}
