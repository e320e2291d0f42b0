//! Calendar helpers. Days are evaluated in the home-terminal time zone,
//! which is a fixed UTC offset taken from the configuration.

use crate::errors::{AppError, AppResult};
use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    SubsecRound, TimeDelta, TimeZone, Utc,
};

/// Start (inclusive) and end (exclusive) of one calendar day, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBounds {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// `now` clamped to the end of this day.
    pub fn clamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.min(self.end)
    }
}

pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> DayBounds {
    let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
    let start = local_midnight - TimeDelta::seconds(offset.local_minus_utc() as i64);
    DayBounds {
        date,
        start,
        end: start + TimeDelta::days(1),
    }
}

/// The calendar date a timestamp falls on at the terminal.
pub fn local_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

pub fn today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    local_date(now, offset)
}

/// `n` consecutive dates ending at `last` inclusive, oldest first.
pub fn trailing_days(last: NaiveDate, n: u32) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n as usize);
    for back in (0..n).rev() {
        if let Some(d) = last.checked_sub_days(Days::new(back as u64)) {
            out.push(d);
        }
    }
    out
}

/// All dates from `first` to `last` inclusive.
pub fn dates_between(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    first.iter_days().take_while(|d| *d <= last).collect()
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s.to_string()))
}

/// Accepts RFC 3339 (`2025-03-01T08:00:00Z`) or a terminal-local
/// `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_timestamp(s: &str, offset: FixedOffset) -> AppResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| AppError::InvalidTimestamp(format!("cannot parse '{}'", s)))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::InvalidTimestamp(format!("ambiguous local time '{}'", s)))
}

/// Parse "+HH:MM" / "-HH:MM" (or "Z").
pub fn parse_offset(s: &str) -> AppResult<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    s.parse::<FixedOffset>()
        .map_err(|_| AppError::Config(format!("invalid UTC offset '{}'", s)))
}

/// Drop sub-second precision; stored timestamps carry whole seconds only.
pub fn whole_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

/// Storage format for timestamps: RFC 3339, whole seconds, `Z` suffix.
pub fn to_db_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn from_db_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
