use crate::cli::commands::open_engine;
use crate::cli::parser::{Cli, Commands, DriverAction};
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::schedule::CycleSchedule;
use crate::ui::messages::{info, success};
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Driver { action } = cmd else {
        return Ok(());
    };
    let mut engine = open_engine(cli, cfg)?;

    match action {
        DriverAction::Add {
            name,
            schedule,
            vehicle,
        } => {
            let schedule: CycleSchedule = match schedule {
                Some(s) => s.parse()?,
                None => cfg.schedule()?,
            };
            let driver = engine.add_driver(name, schedule, vehicle.as_deref())?;
            success(format!(
                "Driver {} '{}' registered on the {} schedule",
                driver.id, driver.name, driver.schedule
            ));
        }
        DriverAction::List => {
            let drivers = engine.drivers()?;
            if drivers.is_empty() {
                info("No drivers registered.");
                return Ok(());
            }

            let mut table = Table::new(&["ID", "NAME", "SCHEDULE", "VEHICLE"]);
            for d in &drivers {
                table.add_row(vec![
                    d.id.to_string(),
                    d.name.clone(),
                    d.schedule.to_string(),
                    d.vehicle_display(),
                ]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
