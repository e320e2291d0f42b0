use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;
use unicode_width::UnicodeWidthStr;

const MAX_TARGET_WIDTH: usize = 40;

fn color_for_operation(op: &str) -> Colour {
    match op {
        "status" => Colour::Green,
        "status_advisory" => Colour::Yellow,
        "violation" => Colour::Red,
        "edit" => Colour::Yellow,
        "certify" => Colour::Cyan,
        "driver_add" => Colour::Blue,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if matches!(cmd, Commands::Log { print: true }) {
        let pool = DbPool::open(cfg.database_path(), cfg.busy_timeout())?;
        let entries = load_log(&pool.conn)?;

        let id_w = entries
            .iter()
            .map(|e| e.id.to_string().len())
            .max()
            .unwrap_or(1);
        let op_w = entries
            .iter()
            .map(|e| e.operation.width() + e.target.width().min(MAX_TARGET_WIDTH) + 3)
            .max()
            .unwrap_or(10);

        println!("📜 Internal log:\n");

        for e in entries {
            let colour = color_for_operation(&e.operation);
            let target = truncate(&e.target, MAX_TARGET_WIDTH);
            let plain = if target.is_empty() {
                e.operation.clone()
            } else {
                format!("{} ({})", e.operation, target)
            };
            let padding = " ".repeat(op_w.saturating_sub(plain.width()));
            let painted = if target.is_empty() {
                colour.paint(e.operation.as_str()).to_string()
            } else {
                format!("{} ({})", colour.paint(e.operation.as_str()), target)
            };

            println!(
                "{:>id_w$}: {} | {}{} => {}",
                e.id,
                e.date,
                painted,
                padding,
                e.message,
                id_w = id_w
            );
        }
    }

    Ok(())
}
