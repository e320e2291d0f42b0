//! Row mapping and SQL for drivers, daily logs, duty segments and violations.

use crate::errors::{AppError, AppResult};
use crate::models::daily_log::DailyLog;
use crate::models::driver::Driver;
use crate::models::duty_status::DutyStatus;
use crate::models::hours::Hours;
use crate::models::location::Location;
use crate::models::schedule::CycleSchedule;
use crate::models::segment::{DutyStatusSegment, EditInfo, NewSegment};
use crate::models::violation::{HosViolation, Resolution, Severity, ViolationKind};
use crate::utils::date::{from_db_ts, to_db_ts};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

const DATE_FMT: &str = "%Y-%m-%d";

fn conversion_error(col: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

fn ts_col(row: &Row, name: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(name)?;
    from_db_ts(&raw).ok_or_else(|| conversion_error(0, AppError::InvalidTimestamp(raw.clone())))
}

fn opt_ts_col(row: &Row, name: &str) -> Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(name)? {
        Some(raw) => from_db_ts(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(0, AppError::InvalidTimestamp(raw.clone()))),
        None => Ok(None),
    }
}

fn date_str(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

pub fn map_driver(row: &Row) -> Result<Driver> {
    let schedule_str: String = row.get("schedule")?;
    let schedule = CycleSchedule::from_db_str(&schedule_str)
        .ok_or_else(|| conversion_error(0, AppError::InvalidSchedule(schedule_str.clone())))?;

    Ok(Driver {
        id: row.get("id")?,
        name: row.get("name")?,
        schedule,
        vehicle_number: row.get("vehicle_number")?,
    })
}

pub fn insert_driver(
    conn: &Connection,
    name: &str,
    schedule: CycleSchedule,
    vehicle_number: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Driver> {
    conn.execute(
        "INSERT INTO drivers (name, schedule, vehicle_number, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, schedule.to_db_str(), vehicle_number, to_db_ts(now)],
    )?;

    Ok(Driver {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        schedule,
        vehicle_number: vehicle_number.map(str::to_string),
    })
}

pub fn load_driver(conn: &Connection, id: i64) -> AppResult<Driver> {
    let mut stmt = conn.prepare_cached("SELECT * FROM drivers WHERE id = ?1")?;
    stmt.query_row([id], map_driver)
        .optional()?
        .ok_or(AppError::DriverNotFound(id))
}

pub fn list_drivers(conn: &Connection) -> AppResult<Vec<Driver>> {
    let mut stmt = conn.prepare("SELECT * FROM drivers ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_driver)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Daily logs
// ---------------------------------------------------------------------------

pub fn map_log(row: &Row) -> Result<DailyLog> {
    let raw_date: String = row.get("log_date")?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FMT)
        .map_err(|_| conversion_error(0, AppError::InvalidDate(raw_date.clone())))?;

    Ok(DailyLog {
        id: row.get("id")?,
        driver_id: row.get("driver_id")?,
        date,
        vehicle_number: row.get("vehicle_number")?,
        off_duty: Hours::from_secs(row.get("off_duty_secs")?),
        sleeper_berth: Hours::from_secs(row.get("sleeper_berth_secs")?),
        driving: Hours::from_secs(row.get("driving_secs")?),
        on_duty_not_driving: Hours::from_secs(row.get("on_duty_secs")?),
        cycle_used: Hours::from_secs(row.get("cycle_used_secs")?),
        cycle_ceiling: Hours::from_secs(row.get("cycle_ceiling_secs")?),
        odometer_start: row.get("odometer_start")?,
        odometer_end: row.get("odometer_end")?,
        total_miles: row.get("total_miles")?,
        has_violations: row.get::<_, i32>("has_violations")? == 1,
        violation_notes: row.get("violation_notes")?,
        certified: row.get::<_, i32>("is_certified")? == 1,
        certified_at: opt_ts_col(row, "certified_at")?,
        signature: row.get("signature")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub fn find_log(conn: &Connection, driver_id: i64, date: NaiveDate) -> AppResult<Option<DailyLog>> {
    let mut stmt =
        conn.prepare_cached("SELECT * FROM daily_logs WHERE driver_id = ?1 AND log_date = ?2")?;
    Ok(stmt
        .query_row(params![driver_id, date_str(date)], map_log)
        .optional()?)
}

pub fn load_log(conn: &Connection, log_id: i64) -> AppResult<DailyLog> {
    let mut stmt = conn.prepare_cached("SELECT * FROM daily_logs WHERE id = ?1")?;
    Ok(stmt.query_row([log_id], map_log)?)
}

/// Resolve the driver's log for `date`, creating it on first use.
///
/// The cycle ceiling is taken from the driver's schedule at creation and
/// is never rewritten afterwards.
pub fn ensure_log(
    conn: &Connection,
    driver: &Driver,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<DailyLog> {
    if let Some(log) = find_log(conn, driver.id, date)? {
        return Ok(log);
    }

    let now_str = to_db_ts(now);
    conn.execute(
        "INSERT INTO daily_logs (driver_id, log_date, vehicle_number, cycle_ceiling_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            driver.id,
            date_str(date),
            driver.vehicle_display(),
            driver.schedule.ceiling().secs(),
            now_str,
        ],
    )?;

    tracing::debug!(driver = driver.id, %date, "daily log created");
    load_log(conn, conn.last_insert_rowid())
}

/// Logs with `from <= log_date <= to`, oldest first.
pub fn logs_between(
    conn: &Connection,
    driver_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<DailyLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM daily_logs
         WHERE driver_id = ?1 AND log_date >= ?2 AND log_date <= ?3
         ORDER BY log_date ASC",
    )?;
    let rows = stmt.query_map(params![driver_id, date_str(from), date_str(to)], map_log)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn all_logs(conn: &Connection) -> AppResult<Vec<DailyLog>> {
    let mut stmt = conn.prepare("SELECT * FROM daily_logs ORDER BY driver_id, log_date")?;
    let rows = stmt.query_map([], map_log)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Persist the recomputed cache columns of a log.
pub fn update_log_totals(conn: &Connection, log: &DailyLog, now: DateTime<Utc>) -> AppResult<()> {
    conn.execute(
        "UPDATE daily_logs
         SET off_duty_secs = ?1, sleeper_berth_secs = ?2,
             driving_secs = ?3, on_duty_secs = ?4,
             cycle_used_secs = ?5,
             odometer_start = ?6, odometer_end = ?7, total_miles = ?8,
             updated_at = ?9
         WHERE id = ?10",
        params![
            log.off_duty.secs(),
            log.sleeper_berth.secs(),
            log.driving.secs(),
            log.on_duty_not_driving.secs(),
            log.cycle_used.secs(),
            log.odometer_start,
            log.odometer_end,
            log.total_miles,
            to_db_ts(now),
            log.id,
        ],
    )?;
    Ok(())
}

pub fn update_log_violations(
    conn: &Connection,
    log_id: i64,
    has_violations: bool,
    notes: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE daily_logs
         SET has_violations = ?1, violation_notes = ?2, updated_at = ?3
         WHERE id = ?4",
        params![has_violations as i32, notes, to_db_ts(now), log_id],
    )?;
    Ok(())
}

/// Seal a log. Only flips an uncertified row; returns false when the log
/// was already certified, leaving the first signature untouched.
pub fn certify_log(
    conn: &Connection,
    log_id: i64,
    at: DateTime<Utc>,
    signature: &str,
) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE daily_logs
         SET is_certified = 1, certified_at = ?1, signature = ?2, updated_at = ?1
         WHERE id = ?3 AND is_certified = 0",
        params![to_db_ts(at), signature, log_id],
    )?;
    Ok(changed == 1)
}

// ---------------------------------------------------------------------------
// Duty segments
// ---------------------------------------------------------------------------

pub fn map_segment(row: &Row) -> Result<DutyStatusSegment> {
    let status_str: String = row.get("status")?;
    let status = DutyStatus::from_db_str(&status_str)
        .ok_or_else(|| conversion_error(0, AppError::InvalidStatus(status_str.clone())))?;

    let edit = if row.get::<_, i32>("is_edited")? == 1 {
        Some(EditInfo {
            edited_by: row.get::<_, Option<String>>("edited_by")?.unwrap_or_default(),
            reason: row.get("edit_reason")?,
            edited_at: ts_col(row, "edited_at")?,
        })
    } else {
        None
    };

    Ok(DutyStatusSegment {
        id: row.get("id")?,
        log_id: row.get("log_id")?,
        driver_id: row.get("driver_id")?,
        trip_id: row.get("trip_id")?,
        status,
        start: ts_col(row, "start_time")?,
        end: opt_ts_col(row, "end_time")?,
        location: Location::from_db(
            row.get("location")?,
            row.get("latitude")?,
            row.get("longitude")?,
        ),
        remarks: row.get("remarks")?,
        odometer: row.get("odometer")?,
        edit,
        created_at: ts_col(row, "created_at")?,
    })
}

pub fn insert_segment(
    conn: &Connection,
    seg: &NewSegment,
    now: DateTime<Utc>,
) -> AppResult<DutyStatusSegment> {
    conn.execute(
        "INSERT INTO duty_segments
            (log_id, driver_id, trip_id, status, start_time, end_time,
             location, latitude, longitude, remarks, odometer, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            seg.log_id,
            seg.driver_id,
            seg.trip_id,
            seg.status.to_db_str(),
            to_db_ts(seg.start),
            seg.end.map(to_db_ts),
            seg.location.text,
            seg.location.latitude(),
            seg.location.longitude(),
            seg.remarks,
            seg.odometer,
            to_db_ts(now),
        ],
    )?;

    load_segment(conn, conn.last_insert_rowid())?
        .ok_or(AppError::SegmentNotFound(conn.last_insert_rowid()))
}

pub fn load_segment(conn: &Connection, id: i64) -> AppResult<Option<DutyStatusSegment>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM duty_segments WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_segment).optional()?)
}

/// The driver's single open segment, whichever day it belongs to.
pub fn active_segment(conn: &Connection, driver_id: i64) -> AppResult<Option<DutyStatusSegment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM duty_segments
         WHERE driver_id = ?1 AND end_time IS NULL
         ORDER BY start_time DESC
         LIMIT 1",
    )?;
    Ok(stmt.query_row([driver_id], map_segment).optional()?)
}

/// Latest stored end time across all the driver's closed segments.
pub fn latest_closed_end(conn: &Connection, driver_id: i64) -> AppResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn.query_row(
        "SELECT MAX(end_time) FROM duty_segments WHERE driver_id = ?1",
        [driver_id],
        |row| row.get(0),
    )?;
    Ok(raw.as_deref().and_then(from_db_ts))
}

/// Close the segment if (and only if) it is still open.
/// Returns false when someone else closed it first.
pub fn close_segment(conn: &Connection, id: i64, end: DateTime<Utc>) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE duty_segments SET end_time = ?1 WHERE id = ?2 AND end_time IS NULL",
        params![to_db_ts(end), id],
    )?;
    Ok(changed == 1)
}

/// Segments of one daily log, ordered by start.
pub fn segments_for_log(conn: &Connection, log_id: i64) -> AppResult<Vec<DutyStatusSegment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM duty_segments WHERE log_id = ?1 ORDER BY start_time ASC, id ASC",
    )?;
    let rows = stmt.query_map([log_id], map_segment)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Segments of every log dated `from..=to` for the driver, ordered by start.
pub fn segments_between(
    conn: &Connection,
    driver_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<DutyStatusSegment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.* FROM duty_segments s
         JOIN daily_logs l ON l.id = s.log_id
         WHERE l.driver_id = ?1 AND l.log_date >= ?2 AND l.log_date <= ?3
         ORDER BY s.start_time ASC, s.id ASC",
    )?;
    let rows = stmt.query_map(params![driver_id, date_str(from), date_str(to)], map_segment)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Rewrite a segment after a correction, stamping the edit fields.
pub fn update_segment(conn: &Connection, seg: &DutyStatusSegment) -> AppResult<()> {
    let edit = seg.edit.as_ref();
    conn.execute(
        "UPDATE duty_segments
         SET status = ?1, start_time = ?2, end_time = ?3,
             location = ?4, latitude = ?5, longitude = ?6,
             remarks = ?7, odometer = ?8, trip_id = ?9,
             is_edited = ?10, edited_by = ?11, edit_reason = ?12, edited_at = ?13
         WHERE id = ?14",
        params![
            seg.status.to_db_str(),
            to_db_ts(seg.start),
            seg.end.map(to_db_ts),
            seg.location.text,
            seg.location.latitude(),
            seg.location.longitude(),
            seg.remarks,
            seg.odometer,
            seg.trip_id,
            edit.is_some() as i32,
            edit.map(|e| e.edited_by.clone()),
            edit.map(|e| e.reason.clone()).unwrap_or_default(),
            edit.map(|e| to_db_ts(e.edited_at)),
            seg.id,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

pub fn map_violation(row: &Row) -> Result<HosViolation> {
    let kind_str: String = row.get("kind")?;
    let kind = ViolationKind::from_db_str(&kind_str).ok_or_else(|| {
        conversion_error(0, AppError::Migration(format!("unknown violation kind {}", kind_str)))
    })?;
    let severity_str: String = row.get("severity")?;
    let severity = Severity::from_db_str(&severity_str).ok_or_else(|| {
        conversion_error(0, AppError::Migration(format!("unknown severity {}", severity_str)))
    })?;

    let resolution = if row.get::<_, i32>("is_resolved")? == 1 {
        Some(Resolution {
            resolved_by: row.get::<_, Option<String>>("resolved_by")?.unwrap_or_default(),
            notes: row.get("resolution_notes")?,
            resolved_at: ts_col(row, "resolved_at")?,
        })
    } else {
        None
    };

    Ok(HosViolation {
        id: row.get("id")?,
        log_id: row.get("log_id")?,
        driver_id: row.get("driver_id")?,
        kind,
        severity,
        description: row.get("description")?,
        violation_time: ts_col(row, "violation_time")?,
        excess: row.get::<_, Option<i64>>("excess_secs")?.map(Hours::from_secs),
        resolution,
        created_at: ts_col(row, "created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn insert_violation(
    conn: &Connection,
    log_id: i64,
    driver_id: i64,
    kind: ViolationKind,
    description: &str,
    violation_time: DateTime<Utc>,
    excess: Option<Hours>,
    now: DateTime<Utc>,
) -> AppResult<HosViolation> {
    conn.execute(
        "INSERT INTO hos_violations
            (log_id, driver_id, kind, severity, description, violation_time, excess_secs, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            log_id,
            driver_id,
            kind.to_db_str(),
            kind.severity().to_db_str(),
            description,
            to_db_ts(violation_time),
            excess.map(Hours::secs),
            to_db_ts(now),
        ],
    )?;

    let mut stmt = conn.prepare_cached("SELECT * FROM hos_violations WHERE id = ?1")?;
    Ok(stmt.query_row([conn.last_insert_rowid()], map_violation)?)
}

/// True when the log already has an unresolved violation of this kind.
pub fn open_violation_exists(conn: &Connection, log_id: i64, kind: ViolationKind) -> AppResult<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM hos_violations
         WHERE log_id = ?1 AND kind = ?2 AND is_resolved = 0
         LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![log_id, kind.to_db_str()], |_| Ok(()))
        .optional()?
        .is_some())
}

pub fn violations_for_log(conn: &Connection, log_id: i64) -> AppResult<Vec<HosViolation>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM hos_violations WHERE log_id = ?1 ORDER BY violation_time ASC, id ASC",
    )?;
    let rows = stmt.query_map([log_id], map_violation)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Violations on the driver's logs dated `from..=to`, newest first.
pub fn violations_between(
    conn: &Connection,
    driver_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<HosViolation>> {
    let mut stmt = conn.prepare_cached(
        "SELECT v.* FROM hos_violations v
         JOIN daily_logs l ON l.id = v.log_id
         WHERE v.driver_id = ?1 AND l.log_date >= ?2 AND l.log_date <= ?3
         ORDER BY v.violation_time DESC, v.id DESC",
    )?;
    let rows = stmt.query_map(params![driver_id, date_str(from), date_str(to)], map_violation)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// True when the driver has any segment on a log dated before `date`.
pub fn has_segments_before(conn: &Connection, driver_id: i64, date: NaiveDate) -> AppResult<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM duty_segments s
         JOIN daily_logs l ON l.id = s.log_id
         WHERE l.driver_id = ?1 AND l.log_date < ?2
         LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![driver_id, date_str(date)], |_| Ok(()))
        .optional()?
        .is_some())
}
