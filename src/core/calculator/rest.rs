//! 10-hour rest detection over a bounded lookback.
//!
//! Contiguous off-duty / sleeper-berth segments form one rest run, so a rest
//! split by midnight or by a change between the two statuses still counts.

use crate::models::hours::Hours;
use crate::models::segment::DutyStatusSegment;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RestStatus {
    /// A qualifying rest was found. `ended_at` equals `now` when the driver
    /// is still resting.
    Rested {
        ended_at: DateTime<Utc>,
        since_rest: Hours,
        within_window: bool,
    },
    /// The ledger begins inside the lookback and holds no qualifying rest;
    /// the duty period is measured from the first recorded segment.
    LedgerStart {
        started_at: DateTime<Utc>,
        since_start: Hours,
        within_window: bool,
    },
    /// Segments exist across the whole lookback but none of them is a
    /// qualifying rest.
    NoQualifyingRest,
    /// Nothing recorded for the driver at all.
    NoHistory,
}

impl RestStatus {
    pub fn rest_required(&self) -> bool {
        match self {
            RestStatus::Rested { within_window, .. }
            | RestStatus::LedgerStart { within_window, .. } => !within_window,
            RestStatus::NoQualifyingRest => true,
            RestStatus::NoHistory => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RestStatus::Rested {
                since_rest,
                within_window,
                ..
            } => {
                if since_rest.is_zero() {
                    "resting now".to_string()
                } else if *within_window {
                    format!("{}h since last 10-hour rest", since_rest)
                } else {
                    format!("{}h since last 10-hour rest, window expired", since_rest)
                }
            }
            RestStatus::LedgerStart { since_start, .. } => {
                format!("{}h since first recorded duty status", since_start)
            }
            RestStatus::NoQualifyingRest => "no 10-hour rest found in lookback".to_string(),
            RestStatus::NoHistory => "no duty history".to_string(),
        }
    }
}

/// Find the most recent rest run of at least `min_rest`.
///
/// `segments` covers the lookback days; `earlier_history` tells whether the
/// driver has any segment before them. `window` is how long after a rest the
/// driver stays within the duty window.
pub fn rest_status(
    segments: &[DutyStatusSegment],
    now: DateTime<Utc>,
    min_rest: Hours,
    window: Hours,
    earlier_history: bool,
) -> RestStatus {
    let mut sorted: Vec<&DutyStatusSegment> = segments.iter().filter(|s| s.start <= now).collect();
    sorted.sort_by_key(|s| s.start);

    let Some(first) = sorted.first() else {
        return if earlier_history {
            RestStatus::NoQualifyingRest
        } else {
            RestStatus::NoHistory
        };
    };
    let ledger_start = first.start;

    let mut last_rest_end: Option<DateTime<Utc>> = None;
    let mut run: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    let close_run = |run: (DateTime<Utc>, DateTime<Utc>), last: &mut Option<DateTime<Utc>>| {
        if Hours::from_delta(run.1 - run.0) >= min_rest {
            *last = Some(run.1);
        }
    };

    for seg in sorted {
        let end = seg.end.unwrap_or(now).min(now);
        if seg.status.is_rest() {
            run = match run {
                Some((start, run_end)) if run_end == seg.start => Some((start, end)),
                Some(prev) => {
                    close_run(prev, &mut last_rest_end);
                    Some((seg.start, end))
                }
                None => Some((seg.start, end)),
            };
        } else if let Some(prev) = run.take() {
            close_run(prev, &mut last_rest_end);
        }
    }
    if let Some(prev) = run {
        close_run(prev, &mut last_rest_end);
    }

    match last_rest_end {
        Some(ended_at) => {
            let since_rest = Hours::from_delta(now - ended_at).clamp_non_negative();
            RestStatus::Rested {
                ended_at,
                since_rest,
                within_window: since_rest < window,
            }
        }
        None if !earlier_history => {
            let since_start = Hours::from_delta(now - ledger_start).clamp_non_negative();
            RestStatus::LedgerStart {
                started_at: ledger_start,
                since_start,
                within_window: since_start < window,
            }
        }
        None => RestStatus::NoQualifyingRest,
    }
}
