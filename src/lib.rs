//! rHOSlog library root.
//! Hours-of-Service compliance engine (`core::engine::HosEngine`) plus the
//! CLI parser and the high-level `run()` used by the binary.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    use cli::commands;

    match &cli.command {
        Commands::Init => commands::init::handle(cli),
        Commands::Config { .. } => commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => commands::db::handle(&cli.command, cli, cfg),
        Commands::Log { .. } => commands::log::handle(&cli.command, cfg),
        Commands::Driver { .. } => commands::driver::handle(&cli.command, cli, cfg),
        Commands::Change { .. } | Commands::Amend { .. } | Commands::Current => {
            commands::status::handle(&cli.command, cli, cfg)
        }
        Commands::CanDrive | Commands::Available | Commands::Predict { .. } => {
            commands::rules::handle(&cli.command, cli, cfg)
        }
        Commands::Daily { .. }
        | Commands::Cycle { .. }
        | Commands::Violations { .. }
        | Commands::Recompute { .. } => commands::summary::handle(&cli.command, cli, cfg),
        Commands::Certify { .. } => commands::certify::handle(&cli.command, cli, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // load the configuration once
    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = Config::resolve_db_path(custom_db)
            .to_string_lossy()
            .to_string();
    }

    dispatch(&cli, &cfg)
}
