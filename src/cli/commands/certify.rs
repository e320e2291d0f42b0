use crate::cli::commands::{driver_id, open_engine};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::success;
use crate::utils::date::parse_date;

pub fn handle(cmd: &Commands, cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Certify { date, signature } = cmd {
        let date = parse_date(date)?;
        let driver = driver_id(cli, cfg)?;
        let mut engine = open_engine(cli, cfg)?;

        let log = engine.certify(driver, date, signature)?;
        let at = log
            .certified_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        success(format!("Daily log {} certified at {}", log.date_str(), at));
    }
    Ok(())
}
