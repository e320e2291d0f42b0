//! Numeric HOS thresholds and the verdicts derived from them.
//!
//! Everything here is pure: the engine gathers a [`ComplianceState`] from
//! the ledger and these functions only look at it.

use crate::core::calculator::{BreakStatus, CycleTotals, DailyTotals, RestStatus};
use crate::models::hours::Hours;
use crate::models::violation::ViolationKind;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HosRules {
    pub max_driving: Hours,
    pub max_duty: Hours,
    pub break_after: Hours,
    pub break_duration: Hours,
    pub min_rest: Hours,
    pub rest_lookback_days: u32,
}

impl Default for HosRules {
    fn default() -> Self {
        Self {
            max_driving: Hours::from_hours(11),
            max_duty: Hours::from_hours(14),
            break_after: Hours::from_hours(8),
            break_duration: Hours::from_minutes(30),
            min_rest: Hours::from_hours(10),
            rest_lookback_days: 3,
        }
    }
}

/// Aggregated view of one driver at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceState {
    pub date: NaiveDate,
    pub totals: DailyTotals,
    pub cycle: CycleTotals,
    pub breaks: BreakStatus,
    pub rest: RestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrivingVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    pub blocking: Option<ViolationKind>,
}

impl DrivingVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            blocking: None,
        }
    }

    fn deny(kind: ViolationKind, reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            blocking: Some(kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitingFactor {
    DailyDriving,
    DutyWindow,
    Cycle,
}

impl fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitingFactor::DailyDriving => "daily driving limit",
            LimitingFactor::DutyWindow => "14-hour duty window",
            LimitingFactor::Cycle => "cycle limit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableTime {
    pub driving_remaining: Hours,
    pub duty_remaining: Hours,
    pub cycle_remaining: Hours,
    pub available: Hours,
    pub limiting_factor: LimitingFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictedViolation {
    pub kind: ViolationKind,
    pub projected: Hours,
    pub limit: Hours,
    pub excess: Hours,
}

impl HosRules {
    pub fn with_rest_lookback(mut self, days: u32) -> Self {
        self.rest_lookback_days = days.max(1);
        self
    }

    pub fn driving_remaining(&self, totals: &DailyTotals) -> Hours {
        self.max_driving.saturating_sub(totals.driving)
    }

    pub fn duty_remaining(&self, totals: &DailyTotals) -> Hours {
        self.max_duty.saturating_sub(totals.duty())
    }

    /// Ordered short-circuit: the first failing check is the reason.
    /// Reaching a limit exactly already blocks further driving.
    pub fn can_start_driving(&self, state: &ComplianceState) -> DrivingVerdict {
        if state.cycle.available.is_zero() {
            return DrivingVerdict::deny(
                ViolationKind::CycleLimit,
                format!(
                    "Cycle limit reached: {}h used of {}h in {} days",
                    state.cycle.used, state.cycle.ceiling, state.cycle.window_days
                ),
            );
        }

        if self.driving_remaining(&state.totals).is_zero() {
            return DrivingVerdict::deny(
                ViolationKind::DrivingLimit,
                format!(
                    "Daily driving limit reached: {}h driven of {}h",
                    state.totals.driving, self.max_driving
                ),
            );
        }

        if self.duty_remaining(&state.totals).is_zero() {
            return DrivingVerdict::deny(
                ViolationKind::DutyLimit,
                format!(
                    "14-hour duty window exhausted: {}h on duty",
                    state.totals.duty()
                ),
            );
        }

        if state.breaks.required {
            return DrivingVerdict::deny(
                ViolationKind::BreakRequired,
                format!(
                    "30-minute break required after {}h of driving",
                    state.breaks.driving_since_break
                ),
            );
        }

        if state.rest.rest_required() {
            return DrivingVerdict::deny(
                ViolationKind::RestRequired,
                format!("10-hour rest required: {}", state.rest.describe()),
            );
        }

        DrivingVerdict::allow()
    }

    /// Minimum of the three simultaneous ceilings. Ties go to the first of
    /// daily driving, duty window, cycle.
    pub fn available_driving_time(&self, state: &ComplianceState) -> AvailableTime {
        let driving_remaining = self.driving_remaining(&state.totals);
        let duty_remaining = self.duty_remaining(&state.totals);
        let cycle_remaining = state.cycle.available;

        let mut available = driving_remaining;
        let mut limiting_factor = LimitingFactor::DailyDriving;
        if duty_remaining < available {
            available = duty_remaining;
            limiting_factor = LimitingFactor::DutyWindow;
        }
        if cycle_remaining < available {
            available = cycle_remaining;
            limiting_factor = LimitingFactor::Cycle;
        }

        AvailableTime {
            driving_remaining,
            duty_remaining,
            cycle_remaining,
            available,
            limiting_factor,
        }
    }

    /// What-if: add `planned` driving and report every limit it would exceed.
    pub fn predict_violations(
        &self,
        state: &ComplianceState,
        planned: Hours,
    ) -> Vec<PredictedViolation> {
        let planned = planned.clamp_non_negative();
        let checks = [
            (
                ViolationKind::DrivingLimit,
                state.totals.driving + planned,
                self.max_driving,
            ),
            (
                ViolationKind::DutyLimit,
                state.totals.duty() + planned,
                self.max_duty,
            ),
            (
                ViolationKind::CycleLimit,
                state.cycle.used + planned,
                state.cycle.ceiling,
            ),
        ];

        checks
            .into_iter()
            .filter(|(_, projected, limit)| projected > limit)
            .map(|(kind, projected, limit)| PredictedViolation {
                kind,
                projected,
                limit,
                excess: projected - limit,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(driving: Hours, on_duty: Hours, cycle_used: Hours) -> ComplianceState {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let ceiling = Hours::from_hours(70);
        ComplianceState {
            date,
            totals: DailyTotals {
                driving,
                on_duty_not_driving: on_duty,
                ..DailyTotals::default()
            },
            cycle: CycleTotals {
                as_of: date,
                window_days: 8,
                used: cycle_used,
                ceiling,
                available: ceiling.saturating_sub(cycle_used),
            },
            breaks: BreakStatus {
                required: false,
                driving_since_break: Hours::ZERO,
            },
            rest: RestStatus::NoHistory,
        }
    }

    #[test]
    fn exactly_eleven_hours_blocks_driving() {
        let rules = HosRules::default();
        let s = state(Hours::from_hours(11), Hours::ZERO, Hours::from_hours(11));
        let v = rules.can_start_driving(&s);
        assert!(!v.allowed);
        assert_eq!(v.blocking, Some(ViolationKind::DrivingLimit));
    }

    #[test]
    fn cycle_is_checked_first() {
        let rules = HosRules::default();
        let s = state(Hours::from_hours(11), Hours::ZERO, Hours::from_hours(70));
        let v = rules.can_start_driving(&s);
        assert_eq!(v.blocking, Some(ViolationKind::CycleLimit));
    }

    #[test]
    fn tie_goes_to_daily_driving() {
        let rules = HosRules::default();
        // 8h driving, 3h on duty: 3h driving left, 3h duty left
        let s = state(Hours::from_hours(8), Hours::from_hours(3), Hours::from_hours(20));
        let a = rules.available_driving_time(&s);
        assert_eq!(a.available, Hours::from_hours(3));
        assert_eq!(a.limiting_factor, LimitingFactor::DailyDriving);
    }

    #[test]
    fn predict_reports_each_exceeded_limit() {
        let rules = HosRules::default();
        let s = state(Hours::from_hours(10), Hours::from_hours(3), Hours::from_hours(69));
        let p = rules.predict_violations(&s, Hours::from_hours(2));
        let kinds: Vec<_> = p.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::DrivingLimit,
                ViolationKind::DutyLimit,
                ViolationKind::CycleLimit
            ]
        );
        assert_eq!(p[0].excess, Hours::from_hours(1));
        assert_eq!(p[1].excess, Hours::from_hours(1));
        assert_eq!(p[2].excess, Hours::from_hours(1));
    }
}
