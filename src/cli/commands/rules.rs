use crate::cli::commands::{driver_id, open_engine};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{field, success, violation};
use crate::utils::formatting::{colour_for_remaining, decimal_hours};

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    let driver = driver_id(cli, cfg)?;
    let mut engine = open_engine(cli, cfg)?;

    match cmd {
        Commands::CanDrive => {
            let verdict = engine.can_start_driving(driver)?;
            if verdict.allowed {
                success("Driving permitted.");
            } else {
                return Err(AppError::DrivingNotPermitted(
                    verdict.reason.unwrap_or_default(),
                ));
            }
        }

        Commands::Available => {
            let a = engine.available_driving_time(driver)?;
            field(
                "Available to drive",
                colour_for_remaining(a.available).paint(decimal_hours(a.available)),
            );
            field("Limiting factor", a.limiting_factor);
            field("Driving remaining", decimal_hours(a.driving_remaining));
            field("Duty window remaining", decimal_hours(a.duty_remaining));
            field("Cycle remaining", decimal_hours(a.cycle_remaining));
        }

        Commands::Predict { hours } => {
            let predicted = engine.predict_violations(driver, *hours)?;
            if predicted.is_empty() {
                success(format!("{} more driving stays within every limit.", decimal_hours(*hours)));
            } else {
                for p in predicted {
                    violation(
                        p.kind.severity(),
                        format!(
                            "{}: {} projected, limit {}, over by {}",
                            p.kind,
                            decimal_hours(p.projected),
                            decimal_hours(p.limit),
                            decimal_hours(p.excess)
                        ),
                    );
                }
            }
        }

        _ => {}
    }

    Ok(())
}
