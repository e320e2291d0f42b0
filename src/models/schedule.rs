use crate::errors::AppError;
use crate::models::hours::Hours;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Company operating schedule: 60 hours in 7 days or 70 hours in 8 days.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub enum CycleSchedule {
    #[serde(rename = "7_DAY")]
    SevenDay,
    #[default]
    #[serde(rename = "8_DAY")]
    EightDay,
}

impl CycleSchedule {
    pub fn window_days(&self) -> u32 {
        match self {
            CycleSchedule::SevenDay => 7,
            CycleSchedule::EightDay => 8,
        }
    }

    pub fn ceiling(&self) -> Hours {
        match self {
            CycleSchedule::SevenDay => Hours::from_hours(60),
            CycleSchedule::EightDay => Hours::from_hours(70),
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CycleSchedule::SevenDay => "7_DAY",
            CycleSchedule::EightDay => "8_DAY",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "7_DAY" => Some(CycleSchedule::SevenDay),
            "8_DAY" => Some(CycleSchedule::EightDay),
            _ => None,
        }
    }
}

impl FromStr for CycleSchedule {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "7" | "7_DAY" | "60/7" => Ok(CycleSchedule::SevenDay),
            "8" | "8_DAY" | "70/8" => Ok(CycleSchedule::EightDay),
            _ => Err(AppError::InvalidSchedule(s.to_string())),
        }
    }
}

impl fmt::Display for CycleSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}h/{}-day",
            self.ceiling().secs() / 3_600,
            self.window_days()
        )
    }
}
