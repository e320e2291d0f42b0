pub mod certify;
pub mod config;
pub mod db;
pub mod driver;
pub mod init;
pub mod log;
pub mod rules;
pub mod status;
pub mod summary;

use crate::cli::parser::Cli;
use crate::config::Config;
use crate::core::clock::FixedClock;
use crate::core::engine::HosEngine;
use crate::errors::{AppError, AppResult};
use crate::utils::date::{parse_date, parse_timestamp};
use chrono::NaiveDate;

/// Open the configured database, honouring `--now`.
pub fn open_engine(cli: &Cli, cfg: &Config) -> AppResult<HosEngine> {
    let engine = HosEngine::from_config(cfg)?;
    match &cli.now {
        Some(raw) => {
            let now = parse_timestamp(raw, cfg.terminal_offset()?)?;
            Ok(engine.with_clock(FixedClock::new(now)))
        }
        None => Ok(engine),
    }
}

/// `--driver`, else `default_driver` from the configuration.
pub fn driver_id(cli: &Cli, cfg: &Config) -> AppResult<i64> {
    cli.driver.or(cfg.default_driver).ok_or_else(|| {
        AppError::Config("no driver selected: pass --driver or set default_driver".into())
    })
}

/// A `--date` argument, or the engine's current terminal date.
pub fn date_or_today(raw: &Option<String>, engine: &HosEngine) -> AppResult<NaiveDate> {
    match raw {
        Some(s) => parse_date(s),
        None => Ok(engine.today()),
    }
}
