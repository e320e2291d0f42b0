use crate::errors::AppResult;
use crate::utils::date::to_db_ts;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::params;

/// Write an audit line into the `log` table.
///
/// Called on the same connection (and transaction) as the change it
/// describes, so the audit row commits or rolls back with it.
pub fn ttlog(
    conn: &Connection,
    at: DateTime<Utc>,
    operation: &str,
    target: &str,
    message: &str,
) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO log (date, operation, target, message)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    stmt.execute(params![to_db_ts(at), operation, target, message])?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: i64,
    pub date: String,
    pub operation: String,
    pub target: String,
    pub message: String,
}

pub fn load_log(conn: &Connection) -> AppResult<Vec<LogRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, date, operation, target, message FROM log ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(LogRow {
            id: row.get(0)?,
            date: row.get(1)?,
            operation: row.get(2)?,
            target: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            message: row.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
