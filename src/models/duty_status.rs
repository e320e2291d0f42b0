use crate::errors::AppError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DutyStatus {
    OffDuty,
    SleeperBerth,
    Driving,
    OnDutyNotDriving,
}

impl DutyStatus {
    pub const ALL: [DutyStatus; 4] = [
        DutyStatus::OffDuty,
        DutyStatus::SleeperBerth,
        DutyStatus::Driving,
        DutyStatus::OnDutyNotDriving,
    ];

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "OFF_DUTY",
            DutyStatus::SleeperBerth => "SLEEPER_BERTH",
            DutyStatus::Driving => "DRIVING",
            DutyStatus::OnDutyNotDriving => "ON_DUTY_NOT_DRIVING",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "OFF_DUTY" => Some(DutyStatus::OffDuty),
            "SLEEPER_BERTH" => Some(DutyStatus::SleeperBerth),
            "DRIVING" => Some(DutyStatus::Driving),
            "ON_DUTY_NOT_DRIVING" => Some(DutyStatus::OnDutyNotDriving),
            _ => None,
        }
    }

    /// Helper for CLI input: accepts any case, dashes, and the short codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_uppercase().replace('-', "_");
        match normalized.as_str() {
            "OFF" => Some(DutyStatus::OffDuty),
            "SB" | "SLEEPER" => Some(DutyStatus::SleeperBerth),
            "D" | "DRIVE" => Some(DutyStatus::Driving),
            "ON" => Some(DutyStatus::OnDutyNotDriving),
            other => Self::from_db_str(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "Off duty",
            DutyStatus::SleeperBerth => "Sleeper berth",
            DutyStatus::Driving => "Driving",
            DutyStatus::OnDutyNotDriving => "On duty (not driving)",
        }
    }

    /// Off duty and sleeper berth both count toward breaks and rest.
    pub fn is_rest(&self) -> bool {
        matches!(self, DutyStatus::OffDuty | DutyStatus::SleeperBerth)
    }

    /// Time that counts against the duty window and the cycle.
    pub fn is_on_duty(&self) -> bool {
        matches!(self, DutyStatus::Driving | DutyStatus::OnDutyNotDriving)
    }
}

impl FromStr for DutyStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| AppError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
