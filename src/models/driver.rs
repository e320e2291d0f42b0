use super::schedule::CycleSchedule;
use serde::Serialize;

/// Driver identity as supplied by the account system.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Driver {
    pub id: i64,
    pub name: String,
    pub schedule: CycleSchedule,
    pub vehicle_number: Option<String>,
}

impl Driver {
    pub fn new(id: i64, name: &str, schedule: CycleSchedule) -> Self {
        Self {
            id,
            name: name.to_string(),
            schedule,
            vehicle_number: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle_number: &str) -> Self {
        self.vehicle_number = Some(vehicle_number.to_string());
        self
    }

    /// Display value copied onto each new daily log.
    pub fn vehicle_display(&self) -> String {
        self.vehicle_number
            .clone()
            .unwrap_or_else(|| "N/A".to_string())
    }
}
