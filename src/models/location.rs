use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a duty status change happened: free text plus optional GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub text: String,
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(text: &str) -> Self {
        let trimmed = text.trim();
        Self {
            text: if trimmed.is_empty() {
                "Unknown".to_string()
            } else {
                trimmed.to_string()
            },
            coordinates: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new("")
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    /// Build from the two nullable DB columns; a half-filled pair is dropped.
    pub fn from_db(text: String, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        let coordinates = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self { text, coordinates }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.coordinates {
            Some(c) => write!(f, "{} ({:.5}, {:.5})", self.text, c.latitude, c.longitude),
            None => f.write_str(&self.text),
        }
    }
}
