use crate::cli::commands::{date_or_today, driver_id, open_engine};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::engine::{CycleSummary, DailySummary};
use crate::errors::AppResult;
use crate::models::duty_status::DutyStatus;
use crate::ui::messages::{field, header, info, success, violation};
use crate::core::calculator::totals::clipped_duration;
use crate::utils::date::{day_bounds, parse_date, trailing_days};
use crate::utils::formatting::{decimal_hours, describe_status, hours2readable};
use crate::utils::table::Table;
use chrono::{DateTime, FixedOffset, Utc};

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    let offset = cfg.terminal_offset()?;
    let driver = driver_id(cli, cfg)?;
    let mut engine = open_engine(cli, cfg)?;

    match cmd {
        Commands::Daily { date, json } => {
            let date = date_or_today(date, &engine)?;
            let summary = engine.daily_summary(driver, date)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_daily(&summary, offset, engine.now());
            }
        }

        Commands::Cycle { date, json } => {
            let date = date_or_today(date, &engine)?;
            let summary = engine.cycle_summary(driver, date)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_cycle(&summary);
            }
        }

        Commands::Violations { from, to } => {
            let to = match to {
                Some(s) => parse_date(s)?,
                None => engine.today(),
            };
            let from = match from {
                Some(s) => parse_date(s)?,
                None => trailing_days(to, 30).first().copied().unwrap_or(to),
            };

            let list = engine.violations_between(driver, from, to)?;
            if list.is_empty() {
                success(format!("No violations between {} and {}.", from, to));
            }
            for v in &list {
                let status = if v.is_resolved() { " (resolved)" } else { "" };
                violation(
                    v.severity,
                    format!(
                        "{} {}: {}{}",
                        v.violation_time.with_timezone(&offset).format("%Y-%m-%d %H:%M"),
                        v.kind,
                        v.description,
                        status
                    ),
                );
            }
        }

        Commands::Recompute { date } => {
            let date = date_or_today(date, &engine)?;
            let log = engine.recompute_day(driver, date)?;
            success(format!(
                "Recomputed {}: driving {}, on duty {}, cycle {}",
                log.date_str(),
                decimal_hours(log.driving),
                decimal_hours(log.duty_total()),
                decimal_hours(log.cycle_used)
            ));
        }

        _ => {}
    }

    Ok(())
}

fn print_daily(s: &DailySummary, offset: FixedOffset, now: DateTime<Utc>) {
    header(format!("Daily log {} (driver {})", s.log.date_str(), s.log.driver_id));
    let bounds = day_bounds(s.log.date, offset);
    field("Vehicle", &s.log.vehicle_number);

    let mut table = Table::new(&["#", "STATUS", "START", "END", "DURATION", "LOCATION"]);
    for seg in &s.segments {
        let (label, colour) = describe_status(seg.status);
        let end = seg
            .end
            .map(|e| e.with_timezone(&offset).format("%H:%M").to_string())
            .unwrap_or_else(|| "active".to_string());
        let edited = if seg.edit.is_some() { " *" } else { "" };
        table.add_row(vec![
            format!("{}{}", seg.id, edited),
            colour.paint(label).to_string(),
            seg.start.with_timezone(&offset).format("%H:%M").to_string(),
            end,
            hours2readable(clipped_duration(seg, &bounds, now), false),
            seg.location.to_string(),
        ]);
    }
    if table.is_empty() {
        info("No segments recorded.");
    } else {
        print!("{}", table.render());
    }

    println!();
    for status in DutyStatus::ALL {
        field(status.label(), decimal_hours(s.totals.get(status)));
    }
    field("On duty (window)", decimal_hours(s.totals.duty()));
    field("Cycle used", decimal_hours(s.log.cycle_used));
    field("Cycle ceiling", decimal_hours(s.log.cycle_ceiling));
    if s.log.total_miles > 0 {
        field("Miles", s.log.total_miles);
    }
    field(
        "Since last break",
        format!(
            "{}{}",
            decimal_hours(s.breaks.driving_since_break),
            if s.breaks.required { " (break required)" } else { "" }
        ),
    );
    field(
        "Certified",
        match s.log.certified_at {
            Some(at) => format!("yes, {}", at.with_timezone(&offset).format("%Y-%m-%d %H:%M")),
            None => "no".to_string(),
        },
    );

    for v in &s.violations {
        violation(v.severity, textwrap::fill(&v.description, 72));
    }
}

fn print_cycle(s: &CycleSummary) {
    header(format!(
        "Cycle {} as of {} (driver {})",
        s.schedule, s.totals.as_of, s.driver_id
    ));

    let mut table = Table::new(&["DATE", "ON DUTY"]);
    for d in &s.days {
        table.add_row(vec![d.date.to_string(), decimal_hours(d.duty)]);
    }
    print!("{}", table.render());

    println!();
    field("Used", decimal_hours(s.totals.used));
    field("Ceiling", decimal_hours(s.totals.ceiling));
    field("Available", decimal_hours(s.totals.available));
}
