//! `HosEngine`: the programmatic entry point of the compliance core.
//!
//! Every mutating call runs in one `BEGIN IMMEDIATE` transaction, so a
//! rejected request leaves no trace and two writers for the same driver
//! are serialized by SQLite. Reads run in a deferred transaction and see
//! a single snapshot.

use crate::config::Config;
use crate::core::calculator::cycle::window_start;
use crate::core::calculator::{
    BreakStatus, CycleTotals, DailyTotals, RestStatus, break_status, cycle_totals, daily_totals,
    rest_status,
};
use crate::core::certification::CertificationLogic;
use crate::core::clock::{Clock, SystemClock};
use crate::core::ledger::{LedgerChange, LedgerLogic, SegmentAmendment, StatusChange};
use crate::core::rules::{
    AvailableTime, ComplianceState, DrivingVerdict, HosRules, PredictedViolation,
};
use crate::core::trips::{NoTrip, TripResolver};
use crate::core::violations::ViolationDetector;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::daily_log::DailyLog;
use crate::models::driver::Driver;
use crate::models::duty_status::DutyStatus;
use crate::models::hours::Hours;
use crate::models::location::Location;
use crate::models::schedule::CycleSchedule;
use crate::models::segment::DutyStatusSegment;
use crate::models::violation::{Breach, HosViolation};
use crate::utils::date::{day_bounds, local_date, trailing_days};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rusqlite::Connection;
use serde::Serialize;

/// Result of a status change that went through.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub segment: DutyStatusSegment,
    pub closed: Option<DutyStatusSegment>,
    pub log: DailyLog,
    /// Violations recorded by this call.
    pub violations: Vec<HosViolation>,
    pub available: AvailableTime,
    /// Set by the advisory path when driving was not actually permitted.
    pub warning: Option<String>,
}

/// Outcome of the gated status change. A refusal is a normal result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusOutcome {
    Recorded(StatusReport),
    DrivingNotPermitted { verdict: DrivingVerdict },
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentStatus {
    pub driver_id: i64,
    pub status: DutyStatus,
    pub since: Option<DateTime<Utc>>,
    pub location: Location,
    pub segment_id: Option<i64>,
    pub elapsed: Hours,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub log: DailyLog,
    pub totals: DailyTotals,
    pub breaks: BreakStatus,
    pub segments: Vec<DutyStatusSegment>,
    pub violations: Vec<HosViolation>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub duty: Hours,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub driver_id: i64,
    pub schedule: CycleSchedule,
    pub totals: CycleTotals,
    /// One entry per day of the window, oldest first; days without a log are zero.
    pub days: Vec<DayUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum LedgerProblem {
    MultipleActive { count: usize },
    Overlap { first: i64, second: i64 },
    NonPositiveDuration { segment: i64 },
    OutsideDay { segment: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerIssue {
    pub log_id: i64,
    pub driver_id: i64,
    pub date: NaiveDate,
    pub problem: LedgerProblem,
}

/// Per-call context, copied out of the engine before a transaction borrows the pool.
#[derive(Clone, Copy)]
struct Env<'a> {
    rules: &'a HosRules,
    offset: FixedOffset,
    now: DateTime<Utc>,
}

pub struct HosEngine {
    pool: DbPool,
    clock: Box<dyn Clock>,
    trips: Box<dyn TripResolver>,
    rules: HosRules,
    offset: FixedOffset,
}

impl HosEngine {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            clock: Box::new(SystemClock),
            trips: Box::new(NoTrip),
            rules: HosRules::default(),
            offset: Utc.fix(),
        }
    }

    /// Open the configured database and apply the configured offset and lookback.
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let pool = DbPool::open(cfg.database_path(), cfg.busy_timeout())?;
        Ok(Self::new(pool)
            .with_offset(cfg.terminal_offset()?)
            .with_rules(HosRules::default().with_rest_lookback(cfg.rest_lookback_days)))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_trips(mut self, trips: impl TripResolver + 'static) -> Self {
        self.trips = Box::new(trips);
        self
    }

    pub fn with_rules(mut self, rules: HosRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn rules(&self) -> &HosRules {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Terminal-local date of the engine clock.
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now(), self.offset)
    }

    pub fn pool(&mut self) -> &mut DbPool {
        &mut self.pool
    }

    // ------------------------------------------------------------------
    // Drivers
    // ------------------------------------------------------------------

    pub fn add_driver(
        &mut self,
        name: &str,
        schedule: CycleSchedule,
        vehicle_number: Option<&str>,
    ) -> AppResult<Driver> {
        let now = self.clock.now();
        let tx = self.pool.write_tx()?;
        let driver = queries::insert_driver(&tx, name, schedule, vehicle_number, now)?;
        ttlog(
            &tx,
            now,
            "driver_add",
            &driver.id.to_string(),
            &format!("Driver '{}' added ({})", driver.name, driver.schedule),
        )?;
        tx.commit()?;
        Ok(driver)
    }

    pub fn driver(&mut self, driver_id: i64) -> AppResult<Driver> {
        queries::load_driver(&self.pool.conn, driver_id)
    }

    pub fn drivers(&mut self) -> AppResult<Vec<Driver>> {
        queries::list_drivers(&self.pool.conn)
    }

    // ------------------------------------------------------------------
    // Status changes
    // ------------------------------------------------------------------

    /// Ledger transition plus recompute and violation detection. Not gated.
    pub fn change_status(&mut self, driver_id: i64, change: &StatusChange) -> AppResult<StatusReport> {
        let trip = self.trips.resolve(driver_id);
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.write_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;
        let (ledger, violations) = apply_change(&tx, &driver, change, trip, &env)?;
        let report = finish_report(&tx, &driver, ledger, violations, None, &env)?;
        tx.commit()?;
        Ok(report)
    }

    /// Gated path: a DRIVING transition is refused when the rules say so.
    /// Every other status is always accepted.
    pub fn record_status_change(
        &mut self,
        driver_id: i64,
        change: &StatusChange,
    ) -> AppResult<StatusOutcome> {
        let trip = self.trips.resolve(driver_id);
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.write_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;

        if change.status == DutyStatus::Driving {
            let state = compliance_state(&tx, &driver, &env)?;
            let verdict = env.rules.can_start_driving(&state);
            if !verdict.allowed {
                tracing::warn!(
                    driver = driver_id,
                    reason = verdict.reason.as_deref().unwrap_or_default(),
                    "driving not permitted"
                );
                return Ok(StatusOutcome::DrivingNotPermitted { verdict });
            }
        }

        let (ledger, violations) = apply_change(&tx, &driver, change, trip, &env)?;
        let report = finish_report(&tx, &driver, ledger, violations, None, &env)?;
        tx.commit()?;
        Ok(StatusOutcome::Recorded(report))
    }

    /// Advisory path: the transition is always recorded. When DRIVING was
    /// not permitted, a violation of the blocking kind is recorded too and
    /// the reason comes back as a warning.
    pub fn record_status_change_advisory(
        &mut self,
        driver_id: i64,
        change: &StatusChange,
    ) -> AppResult<StatusReport> {
        let trip = self.trips.resolve(driver_id);
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.write_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;

        let verdict = if change.status == DutyStatus::Driving {
            let state = compliance_state(&tx, &driver, &env)?;
            Some(env.rules.can_start_driving(&state))
        } else {
            None
        };

        let (ledger, mut violations) = apply_change(&tx, &driver, change, trip, &env)?;

        let mut warning = None;
        if let Some(verdict) = verdict
            && !verdict.allowed
            && let Some(kind) = verdict.blocking
        {
            let reason = verdict.reason.unwrap_or_default();
            let log = queries::load_log(&tx, ledger.log.id)?;
            let breach = Breach {
                kind,
                description: reason.clone(),
                excess: None,
            };
            if let Some(v) = ViolationDetector::record_breach(&tx, &log, &breach, env.now)? {
                violations.push(v);
            }
            ViolationDetector::refresh_flags(&tx, log.id, env.now)?;
            ttlog(
                &tx,
                env.now,
                "status_advisory",
                &format!("{}:{}", driver.id, log.date_str()),
                &format!("DRIVING recorded despite: {}", reason),
            )?;
            tracing::warn!(driver = driver.id, %reason, "driving recorded with warning");
            warning = Some(reason);
        }

        let report = finish_report(&tx, &driver, ledger, violations, warning, &env)?;
        tx.commit()?;
        Ok(report)
    }

    /// Correct a stored segment, then recompute its day and re-run detection.
    pub fn amend_segment(
        &mut self,
        segment_id: i64,
        amendment: &SegmentAmendment,
        editor: &str,
        reason: &str,
    ) -> AppResult<DutyStatusSegment> {
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.write_tx()?;
        let seg = LedgerLogic::amend_segment(
            &tx, segment_id, amendment, editor, reason, env.offset, env.now,
        )?;
        let driver = queries::load_driver(&tx, seg.driver_id)?;
        let log = LedgerLogic::recompute_log(&tx, &driver, seg.log_id, env.offset, env.now)?;
        ViolationDetector::record(&tx, &log, env.rules, env.now)?;

        // later logs in the same cycle window carry a stale cycle total
        let horizon = window_end(log.date, driver.schedule);
        for later in queries::logs_between(&tx, driver.id, log.date, horizon)? {
            if later.id != log.id {
                let later = LedgerLogic::recompute_log(&tx, &driver, later.id, env.offset, env.now)?;
                ViolationDetector::record(&tx, &later, env.rules, env.now)?;
            }
        }

        ttlog(
            &tx,
            env.now,
            "edit",
            &seg.id.to_string(),
            &format!("Segment amended by {}: {}", editor, reason),
        )?;
        tx.commit()?;
        Ok(seg)
    }

    // ------------------------------------------------------------------
    // Rules queries
    // ------------------------------------------------------------------

    pub fn compliance_state(&mut self, driver_id: i64) -> AppResult<ComplianceState> {
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.read_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;
        compliance_state(&tx, &driver, &env)
    }

    pub fn can_start_driving(&mut self, driver_id: i64) -> AppResult<DrivingVerdict> {
        let state = self.compliance_state(driver_id)?;
        Ok(self.rules.can_start_driving(&state))
    }

    pub fn available_driving_time(&mut self, driver_id: i64) -> AppResult<AvailableTime> {
        let state = self.compliance_state(driver_id)?;
        Ok(self.rules.available_driving_time(&state))
    }

    pub fn predict_violations(
        &mut self,
        driver_id: i64,
        planned: Hours,
    ) -> AppResult<Vec<PredictedViolation>> {
        let state = self.compliance_state(driver_id)?;
        Ok(self.rules.predict_violations(&state, planned))
    }

    // ------------------------------------------------------------------
    // Certification
    // ------------------------------------------------------------------

    pub fn certify(&mut self, driver_id: i64, date: NaiveDate, signature: &str) -> AppResult<DailyLog> {
        let now = self.clock.now();
        let tx = self.pool.write_tx()?;
        let log = CertificationLogic::certify(&tx, driver_id, date, signature, now)?;
        tx.commit()?;
        Ok(log)
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// The active segment, or OFF_DUTY at an unknown location when none is open.
    pub fn current_status(&mut self, driver_id: i64) -> AppResult<CurrentStatus> {
        let now = self.clock.now();
        let tx = self.pool.read_tx()?;
        queries::load_driver(&tx, driver_id)?;

        Ok(match queries::active_segment(&tx, driver_id)? {
            Some(seg) => CurrentStatus {
                driver_id,
                status: seg.status,
                since: Some(seg.start),
                elapsed: seg.duration_until(now),
                location: seg.location,
                segment_id: Some(seg.id),
            },
            None => CurrentStatus {
                driver_id,
                status: DutyStatus::OffDuty,
                since: None,
                location: Location::unknown(),
                segment_id: None,
                elapsed: Hours::ZERO,
            },
        })
    }

    pub fn daily_summary(&mut self, driver_id: i64, date: NaiveDate) -> AppResult<DailySummary> {
        let Self { pool, clock, rules, offset, .. } = self;
        let now = clock.now();

        let tx = pool.read_tx()?;
        let log = queries::find_log(&tx, driver_id, date)?.ok_or_else(|| {
            AppError::DailyLogNotFound {
                driver: driver_id,
                date: date.to_string(),
            }
        })?;
        let segments = queries::segments_for_log(&tx, log.id)?;
        let bounds = day_bounds(date, *offset);
        let totals = daily_totals(&segments, &bounds, now);
        let breaks = break_status(&segments, &bounds, now, rules.break_after, rules.break_duration);
        let violations = queries::violations_for_log(&tx, log.id)?;

        Ok(DailySummary {
            log,
            totals,
            breaks,
            segments,
            violations,
        })
    }

    pub fn cycle_summary(&mut self, driver_id: i64, as_of: NaiveDate) -> AppResult<CycleSummary> {
        let now = self.clock.now();
        let offset = self.offset;

        let tx = self.pool.read_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;
        let window = LedgerLogic::totals_by_day(
            &tx,
            driver.id,
            window_start(as_of, driver.schedule),
            as_of,
            offset,
            now,
        )?;
        let totals = cycle_totals(&window, as_of, driver.schedule);

        let days = trailing_days(as_of, driver.schedule.window_days())
            .into_iter()
            .map(|date| DayUsage {
                date,
                duty: window
                    .iter()
                    .find(|(d, _)| *d == date)
                    .map(|(_, t)| t.duty())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(CycleSummary {
            driver_id,
            schedule: driver.schedule,
            totals,
            days,
        })
    }

    /// Totals for one day, recomputed from segments. An active segment opened
    /// on an earlier day counts up to `min(now, day end)`.
    pub fn daily_totals(&mut self, driver_id: i64, date: NaiveDate) -> AppResult<DailyTotals> {
        let now = self.clock.now();
        let offset = self.offset;

        let tx = self.pool.read_tx()?;
        let segments = LedgerLogic::day_segments(&tx, driver_id, date, offset, now)?;
        Ok(daily_totals(&segments, &day_bounds(date, offset), now))
    }

    pub fn cycle_totals(&mut self, driver_id: i64, as_of: NaiveDate) -> AppResult<CycleTotals> {
        Ok(self.cycle_summary(driver_id, as_of)?.totals)
    }

    pub fn break_status(&mut self, driver_id: i64, date: NaiveDate) -> AppResult<BreakStatus> {
        let Self { pool, clock, rules, offset, .. } = self;
        let now = clock.now();

        let tx = pool.read_tx()?;
        let segments = LedgerLogic::day_segments(&tx, driver_id, date, *offset, now)?;
        Ok(break_status(
            &segments,
            &day_bounds(date, *offset),
            now,
            rules.break_after,
            rules.break_duration,
        ))
    }

    pub fn rest_status(&mut self, driver_id: i64) -> AppResult<RestStatus> {
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.read_tx()?;
        queries::load_driver(&tx, driver_id)?;
        rest_for(&tx, driver_id, &env)
    }

    pub fn violations_between(
        &mut self,
        driver_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<HosViolation>> {
        queries::violations_between(&self.pool.conn, driver_id, from, to)
    }

    pub fn logs_between(
        &mut self,
        driver_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<DailyLog>> {
        queries::logs_between(&self.pool.conn, driver_id, from, to)
    }

    /// Rebuild the cached totals of one day and re-run detection on it.
    pub fn recompute_day(&mut self, driver_id: i64, date: NaiveDate) -> AppResult<DailyLog> {
        let Self { pool, clock, rules, offset, .. } = self;
        let env = Env {
            rules,
            offset: *offset,
            now: clock.now(),
        };

        let tx = pool.write_tx()?;
        let driver = queries::load_driver(&tx, driver_id)?;
        let log = queries::find_log(&tx, driver_id, date)?.ok_or_else(|| {
            AppError::DailyLogNotFound {
                driver: driver_id,
                date: date.to_string(),
            }
        })?;
        let log = LedgerLogic::recompute_log(&tx, &driver, log.id, env.offset, env.now)?;
        ViolationDetector::record(&tx, &log, env.rules, env.now)?;
        let log = queries::load_log(&tx, log.id)?;
        tx.commit()?;
        Ok(log)
    }

    /// Check every stored log against the ledger invariants.
    pub fn audit_ledger(&mut self) -> AppResult<Vec<LedgerIssue>> {
        let offset = self.offset;
        let tx = self.pool.read_tx()?;
        let mut issues = Vec::new();

        for log in queries::all_logs(&tx)? {
            let segments = queries::segments_for_log(&tx, log.id)?;
            let bounds = day_bounds(log.date, offset);
            let mut push = |problem| {
                issues.push(LedgerIssue {
                    log_id: log.id,
                    driver_id: log.driver_id,
                    date: log.date,
                    problem,
                })
            };

            let active = segments.iter().filter(|s| s.is_active()).count();
            if active > 1 {
                push(LedgerProblem::MultipleActive { count: active });
            }

            for seg in &segments {
                if seg.end.is_some_and(|e| e <= seg.start) {
                    push(LedgerProblem::NonPositiveDuration { segment: seg.id });
                }
                if seg.start < bounds.start || seg.end.is_some_and(|e| e > bounds.end) {
                    push(LedgerProblem::OutsideDay { segment: seg.id });
                }
            }

            for pair in segments.windows(2) {
                if pair[0].overlaps(pair[1].start, pair[1].end) {
                    push(LedgerProblem::Overlap {
                        first: pair[0].id,
                        second: pair[1].id,
                    });
                }
            }
        }

        Ok(issues)
    }
}

// ----------------------------------------------------------------------
// Shared steps
// ----------------------------------------------------------------------

fn window_end(date: NaiveDate, schedule: CycleSchedule) -> NaiveDate {
    date.checked_add_days(chrono::Days::new(schedule.window_days() as u64 - 1))
        .unwrap_or(date)
}

/// Ledger transition, recompute of every touched day, detection, audit row.
fn apply_change(
    conn: &Connection,
    driver: &Driver,
    change: &StatusChange,
    trip: Option<i64>,
    env: &Env,
) -> AppResult<(LedgerChange, Vec<HosViolation>)> {
    let ledger = LedgerLogic::change_status(conn, driver, change, trip, env.offset, env.now)?;

    let mut violations = Vec::new();
    for log_id in &ledger.touched_logs {
        let log = LedgerLogic::recompute_log(conn, driver, *log_id, env.offset, env.now)?;
        violations.extend(ViolationDetector::record(conn, &log, env.rules, env.now)?);
    }

    ttlog(
        conn,
        env.now,
        "status",
        &format!("{}:{}", driver.id, ledger.log.date_str()),
        &format!(
            "{} at {} (segment {})",
            ledger.segment.status, ledger.segment.location, ledger.segment.id
        ),
    )?;

    Ok((ledger, violations))
}

fn finish_report(
    conn: &Connection,
    driver: &Driver,
    ledger: LedgerChange,
    violations: Vec<HosViolation>,
    warning: Option<String>,
    env: &Env,
) -> AppResult<StatusReport> {
    let log = queries::load_log(conn, ledger.log.id)?;
    let state = compliance_state(conn, driver, env)?;

    Ok(StatusReport {
        segment: ledger.segment,
        closed: ledger.closed,
        log,
        violations,
        available: env.rules.available_driving_time(&state),
        warning,
    })
}

fn rest_for(conn: &Connection, driver_id: i64, env: &Env) -> AppResult<RestStatus> {
    let today = local_date(env.now, env.offset);
    let first = trailing_days(today, env.rules.rest_lookback_days)
        .first()
        .copied()
        .unwrap_or(today);

    // a rest still running from before the lookback is part of the scan
    let mut segments = queries::segments_between(conn, driver_id, first, today)?;
    segments.extend(LedgerLogic::carried_segment(
        conn, driver_id, first, env.offset, env.now,
    )?);
    let earlier = queries::has_segments_before(conn, driver_id, first)?;
    Ok(rest_status(
        &segments,
        env.now,
        env.rules.min_rest,
        env.rules.max_duty,
        earlier,
    ))
}

/// Gather everything the rules look at for "now".
fn compliance_state(conn: &Connection, driver: &Driver, env: &Env) -> AppResult<ComplianceState> {
    let date = local_date(env.now, env.offset);
    let bounds = day_bounds(date, env.offset);

    let window = LedgerLogic::totals_by_day(
        conn,
        driver.id,
        window_start(date, driver.schedule),
        date,
        env.offset,
        env.now,
    )?;
    let totals = window
        .iter()
        .find(|(d, _)| *d == date)
        .map(|(_, t)| *t)
        .unwrap_or_default();
    let cycle = cycle_totals(&window, date, driver.schedule);

    let today_segments = LedgerLogic::day_segments(conn, driver.id, date, env.offset, env.now)?;
    let breaks = break_status(
        &today_segments,
        &bounds,
        env.now,
        env.rules.break_after,
        env.rules.break_duration,
    );
    let rest = rest_for(conn, driver.id, env)?;

    Ok(ComplianceState {
        date,
        totals,
        cycle,
        breaks,
        rest,
    })
}
