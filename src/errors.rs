//! Unified application error type.
//! Every layer (db, core, cli, utils) returns AppError so domain rejections
//! and infrastructure faults travel through the same `?` chain.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ---------------------------
    // Input validation
    // ---------------------------
    #[error("Invalid duty status: {0}")]
    InvalidStatus(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid cycle schedule: {0}")]
    InvalidSchedule(String),

    // ---------------------------
    // Ledger / compliance
    // ---------------------------
    #[error("Duty status segment {0} not found")]
    SegmentNotFound(i64),

    #[error("Segment {segment} would overlap segment {sibling}")]
    OverlappingInterval { segment: i64, sibling: i64 },

    #[error("Driving not permitted: {0}")]
    DrivingNotPermitted(String),

    #[error("Daily log for {date} is already certified")]
    AlreadyCertified { date: String },

    #[error("No daily log for driver {driver} on {date}")]
    DailyLogNotFound { driver: i64, date: String },

    #[error("Driver {0} not found")]
    DriverNotFound(i64),

    #[error("Segment {0} was modified by another writer")]
    Conflict(i64),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to save configuration")]
    ConfigSave,
}

impl AppError {
    /// True for storage, IO and config faults; false for domain rejections.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::Db(_)
                | AppError::Migration(_)
                | AppError::Serialization(_)
                | AppError::Config(_)
                | AppError::ConfigSave
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
