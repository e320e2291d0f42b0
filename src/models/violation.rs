use super::hours::Hours;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    DrivingLimit,
    DutyLimit,
    CycleLimit,
    BreakRequired,
    RestRequired,
}

impl ViolationKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ViolationKind::DrivingLimit => "DRIVING_LIMIT",
            ViolationKind::DutyLimit => "DUTY_LIMIT",
            ViolationKind::CycleLimit => "CYCLE_LIMIT",
            ViolationKind::BreakRequired => "BREAK_REQUIRED",
            ViolationKind::RestRequired => "REST_REQUIRED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "DRIVING_LIMIT" => Some(ViolationKind::DrivingLimit),
            "DUTY_LIMIT" => Some(ViolationKind::DutyLimit),
            "CYCLE_LIMIT" => Some(ViolationKind::CycleLimit),
            "BREAK_REQUIRED" => Some(ViolationKind::BreakRequired),
            "REST_REQUIRED" => Some(ViolationKind::RestRequired),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::CycleLimit => Severity::Critical,
            ViolationKind::DrivingLimit | ViolationKind::DutyLimit => Severity::High,
            ViolationKind::RestRequired => Severity::High,
            ViolationKind::BreakRequired => Severity::Medium,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub resolved_by: String,
    pub notes: String,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HosViolation {
    pub id: i64,
    pub log_id: i64,
    pub driver_id: i64,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub violation_time: DateTime<Utc>,
    /// How far past the threshold the driver was when detected.
    pub excess: Option<Hours>,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
}

impl HosViolation {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// A breach found by the detector, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breach {
    pub kind: ViolationKind,
    pub description: String,
    pub excess: Option<Hours>,
}
