//! Versioned schema migrations.
//!
//! Each migration runs once; the `log` table remembers which ones were
//! applied (operation = 'migration_applied', target = version).

use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension};

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250301_0001_drivers_and_daily_logs",
        description: "Created drivers and daily_logs tables",
        sql: r#"
        CREATE TABLE IF NOT EXISTS drivers (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            schedule        TEXT NOT NULL DEFAULT '8_DAY' CHECK(schedule IN ('7_DAY','8_DAY')),
            vehicle_number  TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_logs (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            driver_id           INTEGER NOT NULL REFERENCES drivers(id),
            log_date            TEXT NOT NULL,
            vehicle_number      TEXT NOT NULL DEFAULT 'N/A',
            off_duty_secs       INTEGER NOT NULL DEFAULT 0,
            sleeper_berth_secs  INTEGER NOT NULL DEFAULT 0,
            driving_secs        INTEGER NOT NULL DEFAULT 0,
            on_duty_secs        INTEGER NOT NULL DEFAULT 0,
            cycle_used_secs     INTEGER NOT NULL DEFAULT 0,
            cycle_ceiling_secs  INTEGER NOT NULL,
            has_violations      INTEGER NOT NULL DEFAULT 0,
            violation_notes     TEXT NOT NULL DEFAULT '',
            is_certified        INTEGER NOT NULL DEFAULT 0,
            certified_at        TEXT,
            signature           TEXT NOT NULL DEFAULT '',
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            UNIQUE(driver_id, log_date)
        );

        CREATE INDEX IF NOT EXISTS idx_daily_logs_driver_date ON daily_logs(driver_id, log_date);
        "#,
    },
    Migration {
        version: "20250301_0002_duty_segments",
        description: "Created duty_segments table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS duty_segments (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id       INTEGER NOT NULL REFERENCES daily_logs(id),
            driver_id    INTEGER NOT NULL REFERENCES drivers(id),
            trip_id      INTEGER,
            status       TEXT NOT NULL CHECK(status IN ('OFF_DUTY','SLEEPER_BERTH','DRIVING','ON_DUTY_NOT_DRIVING')),
            start_time   TEXT NOT NULL,
            end_time     TEXT,
            location     TEXT NOT NULL DEFAULT 'Unknown',
            latitude     REAL,
            longitude    REAL,
            remarks      TEXT NOT NULL DEFAULT '',
            is_edited    INTEGER NOT NULL DEFAULT 0,
            edited_by    TEXT,
            edit_reason  TEXT NOT NULL DEFAULT '',
            edited_at    TEXT,
            created_at   TEXT NOT NULL,
            CHECK(end_time IS NULL OR end_time > start_time)
        );

        CREATE INDEX IF NOT EXISTS idx_segments_log_start ON duty_segments(log_id, start_time);
        CREATE INDEX IF NOT EXISTS idx_segments_driver_start ON duty_segments(driver_id, start_time);
        "#,
    },
    Migration {
        version: "20250301_0003_hos_violations",
        description: "Created hos_violations table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS hos_violations (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id            INTEGER NOT NULL REFERENCES daily_logs(id),
            driver_id         INTEGER NOT NULL REFERENCES drivers(id),
            kind              TEXT NOT NULL CHECK(kind IN ('DRIVING_LIMIT','DUTY_LIMIT','CYCLE_LIMIT','BREAK_REQUIRED','REST_REQUIRED')),
            severity          TEXT NOT NULL CHECK(severity IN ('LOW','MEDIUM','HIGH','CRITICAL')),
            description       TEXT NOT NULL,
            violation_time    TEXT NOT NULL,
            excess_secs       INTEGER,
            is_resolved       INTEGER NOT NULL DEFAULT 0,
            resolved_by       TEXT,
            resolution_notes  TEXT NOT NULL DEFAULT '',
            resolved_at       TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_violations_driver_time ON hos_violations(driver_id, violation_time);
        CREATE INDEX IF NOT EXISTS idx_violations_log_kind ON hos_violations(log_id, kind, is_resolved);
        "#,
    },
    Migration {
        version: "20250412_0004_odometer_tracking",
        description: "Added odometer columns to duty_segments and daily_logs",
        sql: r#"
        ALTER TABLE duty_segments ADD COLUMN odometer INTEGER;
        ALTER TABLE daily_logs ADD COLUMN odometer_start INTEGER;
        ALTER TABLE daily_logs ADD COLUMN odometer_end INTEGER;
        ALTER TABLE daily_logs ADD COLUMN total_miles INTEGER NOT NULL DEFAULT 0;
        "#,
    },
    Migration {
        version: "20250520_0005_single_active_segment",
        description: "Enforced at most one active duty segment per driver",
        sql: r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_segments_one_active
            ON duty_segments(driver_id) WHERE end_time IS NULL;
        "#,
    },
];

/// Ensure that the `log` table exists.
fn ensure_log_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )
}

fn is_applied(conn: &Connection, version: &str) -> rusqlite::Result<bool> {
    let mut chk = conn.prepare_cached(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    conn.execute_batch(m.sql)
        .map_err(|e| AppError::Migration(format!("{}: {}", m.version, e)))?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'migration_applied', ?1, ?2)",
        [m.version, m.description],
    )?;

    tracing::info!(version = m.version, "migration applied");
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// The whole run holds the write lock, so two processes opening the same
/// fresh database cannot both apply a migration.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("BEGIN IMMEDIATE;")?;

    let result = (|| -> AppResult<()> {
        ensure_log_table(conn)?;
        for m in MIGRATIONS {
            if !is_applied(conn, m.version)? {
                apply(conn, m)?;
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK;")?;
            Err(e)
        }
    }
}

/// Versions already applied, oldest first.
pub fn applied_versions(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
