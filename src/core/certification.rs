use crate::db::log::ttlog;
use crate::db::queries::{certify_log, find_log, load_log};
use crate::errors::{AppError, AppResult};
use crate::models::daily_log::DailyLog;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

/// One-way seal of a daily log.
pub struct CertificationLogic;

impl CertificationLogic {
    /// The signature is stored as given; nothing here checks it.
    pub fn certify(
        conn: &Connection,
        driver_id: i64,
        date: NaiveDate,
        signature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DailyLog> {
        let log = find_log(conn, driver_id, date)?.ok_or_else(|| AppError::DailyLogNotFound {
            driver: driver_id,
            date: date.to_string(),
        })?;

        if log.certified || !certify_log(conn, log.id, now, signature)? {
            return Err(AppError::AlreadyCertified {
                date: log.date_str(),
            });
        }

        ttlog(
            conn,
            now,
            "certify",
            &format!("{}:{}", driver_id, log.date_str()),
            "Daily log certified",
        )?;
        tracing::info!(driver = driver_id, %date, "daily log certified");

        load_log(conn, log.id)
    }
}
