#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use rhoslog::core::clock::FixedClock;
use rhoslog::core::engine::HosEngine;
use rhoslog::core::ledger::StatusChange;
use rhoslog::db::pool::DbPool;
use rhoslog::models::duty_status::DutyStatus;
use rhoslog::models::schedule::CycleSchedule;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub fn rhl() -> Command {
    cargo_bin_cmd!("rhoslog")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rhoslog.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm"] {
        fs::remove_file(format!("{}{}", db_path, suffix)).ok();
    }
    db_path
}

/// Initialize a DB through the CLI and register one driver (id 1).
pub fn init_db_with_driver(db_path: &str) {
    rhl()
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();

    rhl()
        .args(["--db", db_path, "driver", "add", "Ada Driver", "--schedule", "8_DAY"])
        .assert()
        .success();
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory engine on a settable clock, with one 70h/8-day driver.
pub struct Harness {
    pub engine: HosEngine,
    pub clock: Arc<FixedClock>,
    pub driver: i64,
}

impl Harness {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_schedule(start, CycleSchedule::EightDay)
    }

    pub fn with_schedule(start: DateTime<Utc>, schedule: CycleSchedule) -> Self {
        let clock = Arc::new(FixedClock::new(start));
        let mut engine = HosEngine::new(DbPool::in_memory().expect("in-memory db"))
            .with_clock(clock.clone());
        let driver = engine
            .add_driver("Test Driver", schedule, Some("TRK-1"))
            .expect("add driver")
            .id;
        Self {
            engine,
            clock,
            driver,
        }
    }

    /// Move the clock to `at` and record an ungated change there.
    pub fn change_at(&mut self, at: DateTime<Utc>, status: DutyStatus, location: &str) {
        self.clock.set(at);
        self.engine
            .change_status(self.driver, &StatusChange::new(status, location))
            .expect("change status");
    }

    /// One shift of `hours` in `status` starting at `start`, then OFF_DUTY.
    pub fn shift(&mut self, start: DateTime<Utc>, hours: i64, status: DutyStatus) {
        self.change_at(start, status, "Yard");
        self.change_at(start + TimeDelta::hours(hours), DutyStatus::OffDuty, "Home");
    }
}
