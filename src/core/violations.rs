//! Threshold checks on a recomputed daily log and their persistence.

use crate::core::rules::HosRules;
use crate::db::log::ttlog;
use crate::db::queries::{
    insert_violation, open_violation_exists, update_log_violations, violations_for_log,
};
use crate::errors::AppResult;
use crate::models::daily_log::DailyLog;
use crate::models::violation::{Breach, HosViolation, ViolationKind};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub struct ViolationDetector;

impl ViolationDetector {
    /// Independent checks, strictly greater than the limit.
    pub fn detect(log: &DailyLog, rules: &HosRules) -> Vec<Breach> {
        let mut out = Vec::new();

        if log.driving > rules.max_driving {
            out.push(Breach {
                kind: ViolationKind::DrivingLimit,
                description: format!(
                    "Driving time {}h exceeds {}h limit",
                    log.driving, rules.max_driving
                ),
                excess: Some(log.driving - rules.max_driving),
            });
        }

        let duty = log.duty_total();
        if duty > rules.max_duty {
            out.push(Breach {
                kind: ViolationKind::DutyLimit,
                description: format!("On-duty time {}h exceeds {}h window", duty, rules.max_duty),
                excess: Some(duty - rules.max_duty),
            });
        }

        if log.cycle_used > log.cycle_ceiling {
            out.push(Breach {
                kind: ViolationKind::CycleLimit,
                description: format!(
                    "Cycle hours {}h exceed {}h ceiling",
                    log.cycle_used, log.cycle_ceiling
                ),
                excess: Some(log.cycle_used - log.cycle_ceiling),
            });
        }

        out
    }

    /// Run [`ViolationDetector::detect`] and persist what is new.
    pub fn record(
        conn: &Connection,
        log: &DailyLog,
        rules: &HosRules,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<HosViolation>> {
        let mut created = Vec::new();
        for breach in Self::detect(log, rules) {
            if let Some(v) = Self::record_breach(conn, log, &breach, now)? {
                created.push(v);
            }
        }
        Self::refresh_flags(conn, log.id, now)?;
        Ok(created)
    }

    /// Persist one breach unless the log already has an open violation of
    /// the same kind.
    pub fn record_breach(
        conn: &Connection,
        log: &DailyLog,
        breach: &Breach,
        now: DateTime<Utc>,
    ) -> AppResult<Option<HosViolation>> {
        if open_violation_exists(conn, log.id, breach.kind)? {
            return Ok(None);
        }

        let v = insert_violation(
            conn,
            log.id,
            log.driver_id,
            breach.kind,
            &breach.description,
            now,
            breach.excess,
            now,
        )?;

        ttlog(
            conn,
            now,
            "violation",
            &format!("{}:{}", log.driver_id, log.date_str()),
            &format!("{} [{}] {}", v.kind, v.severity.to_db_str(), v.description),
        )?;
        tracing::warn!(
            driver = log.driver_id,
            date = %log.date,
            kind = %v.kind,
            "HOS violation recorded"
        );

        Ok(Some(v))
    }

    /// Sync `has_violations` / `violation_notes` with the stored records.
    pub fn refresh_flags(conn: &Connection, log_id: i64, now: DateTime<Utc>) -> AppResult<()> {
        let all = violations_for_log(conn, log_id)?;
        let notes = all
            .iter()
            .map(|v| v.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        update_log_violations(conn, log_id, !all.is_empty(), &notes, now)
    }
}
