use crate::cli::commands::{driver_id, open_engine};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::engine::{StatusOutcome, StatusReport};
use crate::core::ledger::{SegmentAmendment, StatusChange};
use crate::errors::{AppError, AppResult};
use crate::models::duty_status::DutyStatus;
use crate::models::location::Location;
use crate::ui::messages::{field, success, violation, warning};
use crate::utils::date::parse_timestamp;
use crate::utils::formatting::{colour_for_remaining, decimal_hours, describe_status};

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Change {
            status,
            location,
            lat,
            lon,
            remarks,
            odometer,
            at,
            advisory,
        } => {
            let offset = cfg.terminal_offset()?;
            let mut change = StatusChange::parse(status, location)?;
            if let (Some(lat), Some(lon)) = (lat, lon) {
                change = change.with_coordinates(*lat, *lon);
            }
            if let Some(r) = remarks {
                change = change.with_remarks(r);
            }
            if let Some(o) = odometer {
                change = change.with_odometer(*o);
            }
            if let Some(ts) = at {
                change = change.at(parse_timestamp(ts, offset)?);
            }

            let driver = driver_id(cli, cfg)?;
            let mut engine = open_engine(cli, cfg)?;

            let report = if *advisory {
                engine.record_status_change_advisory(driver, &change)?
            } else {
                match engine.record_status_change(driver, &change)? {
                    StatusOutcome::Recorded(report) => report,
                    StatusOutcome::DrivingNotPermitted { verdict } => {
                        return Err(AppError::DrivingNotPermitted(
                            verdict.reason.unwrap_or_default(),
                        ));
                    }
                }
            };
            print_report(&report);
        }

        Commands::Amend {
            segment_id,
            status,
            start,
            end,
            location,
            remarks,
            odometer,
            editor,
            reason,
        } => {
            let offset = cfg.terminal_offset()?;
            let amendment = SegmentAmendment {
                status: status.as_deref().map(str::parse::<DutyStatus>).transpose()?,
                start: start.as_deref().map(|s| parse_timestamp(s, offset)).transpose()?,
                end: end.as_deref().map(|s| parse_timestamp(s, offset)).transpose()?,
                location: location.as_deref().map(Location::new),
                remarks: remarks.clone(),
                odometer: *odometer,
            };

            let mut engine = open_engine(cli, cfg)?;
            let seg = engine.amend_segment(*segment_id, &amendment, editor, reason)?;
            success(format!(
                "Segment {} amended: {} {} → {}",
                seg.id,
                seg.status,
                seg.start.with_timezone(&offset).format("%Y-%m-%d %H:%M"),
                seg.end
                    .map(|e| e.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "active".to_string())
            ));
        }

        Commands::Current => {
            let offset = cfg.terminal_offset()?;
            let driver = driver_id(cli, cfg)?;
            let mut engine = open_engine(cli, cfg)?;
            let current = engine.current_status(driver)?;

            let (label, colour) = describe_status(current.status);
            println!("{}", colour.bold().paint(label));
            match current.since {
                Some(since) => {
                    field(
                        "Since",
                        since.with_timezone(&offset).format("%Y-%m-%d %H:%M"),
                    );
                    field("Elapsed", decimal_hours(current.elapsed));
                }
                None => field("Since", "no active segment"),
            }
            field("Location", &current.location);
        }

        _ => {}
    }

    Ok(())
}

fn print_report(report: &StatusReport) {
    success(format!(
        "{} recorded at {} (segment {})",
        report.segment.status, report.segment.location, report.segment.id
    ));

    let log = &report.log;
    field("Log date", log.date_str());
    field("Driving", decimal_hours(log.driving));
    field("On duty", decimal_hours(log.duty_total()));
    field("Cycle used", decimal_hours(log.cycle_used));

    let avail = &report.available;
    field(
        "Available to drive",
        format!(
            "{} ({})",
            colour_for_remaining(avail.available).paint(decimal_hours(avail.available)),
            avail.limiting_factor
        ),
    );

    for v in &report.violations {
        violation(v.severity, &v.description);
    }

    if let Some(w) = &report.warning {
        warning(format!("Driving not permitted: {}", w));
    }
}
