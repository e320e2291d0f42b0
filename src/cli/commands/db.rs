use crate::cli::parser::{Cli, Commands};
use crate::cli::commands::open_engine;
use crate::config::Config;
use crate::core::engine::LedgerProblem;
use crate::db::migrate::{applied_versions, run_pending_migrations};
use crate::errors::AppResult;
use crate::ui::messages::{error, field, header, info, success};
use rusqlite::Connection;
use std::fs;

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        info: show_info,
    } = cmd
    {
        // opening the engine already brings the schema up to date
        let mut engine = open_engine(cli, cfg)?;

        if *migrate {
            info("Running migrations…");
            run_pending_migrations(&engine.pool().conn)?;
            success("Migration completed.");
        }

        if *show_info {
            print_db_info(&engine.pool().conn, cfg)?;
        }

        if *check {
            info("Running integrity check…");
            let integrity: String =
                engine
                    .pool()
                    .conn
                    .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                success("Integrity check passed.");
            } else {
                error(format!("Integrity check failed: {}", integrity));
            }

            info("Auditing duty status ledger…");
            let issues = engine.audit_ledger()?;
            if issues.is_empty() {
                success("Ledger invariants hold.");
            } else {
                for issue in &issues {
                    let what = match &issue.problem {
                        LedgerProblem::MultipleActive { count } => {
                            format!("{} active segments", count)
                        }
                        LedgerProblem::Overlap { first, second } => {
                            format!("segments {} and {} overlap", first, second)
                        }
                        LedgerProblem::NonPositiveDuration { segment } => {
                            format!("segment {} does not end after it starts", segment)
                        }
                        LedgerProblem::OutsideDay { segment } => {
                            format!("segment {} lies outside its day", segment)
                        }
                    };
                    error(format!(
                        "driver {} {} (log {}): {}",
                        issue.driver_id, issue.date, issue.log_id, what
                    ));
                }
            }
        }
    }

    Ok(())
}

fn count(conn: &Connection, table: &str) -> AppResult<i64> {
    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
}

fn print_db_info(conn: &Connection, cfg: &Config) -> AppResult<()> {
    let path = cfg.database_path();
    let file_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    header("Database");
    field("File", path.display());
    field("Size", format!("{:.2} MB", file_size as f64 / (1024.0 * 1024.0)));
    field("Drivers", count(conn, "drivers")?);
    field("Daily logs", count(conn, "daily_logs")?);
    field("Duty segments", count(conn, "duty_segments")?);
    field("Violations", count(conn, "hos_violations")?);

    let range: (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(log_date), MAX(log_date) FROM daily_logs",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    match range {
        (Some(first), Some(last)) => field("Date range", format!("{} → {}", first, last)),
        _ => field("Date range", "--"),
    }

    let versions = applied_versions(conn)?;
    field("Migrations", versions.len());
    if let Some(last) = versions.last() {
        field("Schema version", last);
    }
    println!();
    Ok(())
}
