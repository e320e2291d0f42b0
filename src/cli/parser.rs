use crate::models::hours::Hours;
use clap::{Parser, Subcommand};

/// Command-line interface definition for rHOSlog
/// Hours-of-Service duty status ledger and compliance checks on SQLite
#[derive(Parser)]
#[command(
    name = "rhoslog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Hours-of-Service log: record duty status changes and check 11/14/60-70 hour compliance",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Driver id (defaults to `default_driver` from the configuration)
    #[arg(global = true, long = "driver")]
    pub driver: Option<i64>,

    /// Evaluate as of this instant instead of the wall clock
    /// (RFC 3339 or "YYYY-MM-DD HH:MM" terminal time)
    #[arg(global = true, long = "now", value_name = "TIMESTAMP")]
    pub now: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity and ledger invariants")]
        check: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Register or list drivers
    Driver {
        #[command(subcommand)]
        action: DriverAction,
    },

    /// Record a duty status change (OFF_DUTY, SLEEPER_BERTH, DRIVING, ON_DUTY_NOT_DRIVING)
    Change {
        /// New status; short forms off, sb, d, on are accepted
        status: String,

        #[arg(long = "location", short = 'l', default_value = "")]
        location: String,

        #[arg(long = "lat", requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long = "lon", requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[arg(long = "remarks", short = 'r')]
        remarks: Option<String>,

        #[arg(long = "odometer")]
        odometer: Option<i64>,

        /// When the change happened (defaults to now)
        #[arg(long = "at", value_name = "TIMESTAMP")]
        at: Option<String>,

        /// Record DRIVING even when not permitted, flagging a violation
        #[arg(long = "advisory")]
        advisory: bool,
    },

    /// Correct a recorded segment
    Amend {
        segment_id: i64,

        #[arg(long = "status")]
        status: Option<String>,

        #[arg(long = "start", value_name = "TIMESTAMP")]
        start: Option<String>,

        #[arg(long = "end", value_name = "TIMESTAMP")]
        end: Option<String>,

        #[arg(long = "location")]
        location: Option<String>,

        #[arg(long = "remarks")]
        remarks: Option<String>,

        #[arg(long = "odometer")]
        odometer: Option<i64>,

        #[arg(long = "editor", help = "Who is making the correction")]
        editor: String,

        #[arg(long = "reason", help = "Why the record is being corrected")]
        reason: String,
    },

    /// Show the driver's current duty status
    Current,

    /// Check whether the driver may start driving now
    CanDrive,

    /// Show remaining driving time and the limiting factor
    Available,

    /// Report which limits N more hours of driving would exceed
    Predict {
        #[arg(long = "hours", value_parser = parse_hours)]
        hours: Hours,
    },

    /// Daily log summary
    Daily {
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        date: Option<String>,

        #[arg(long = "json")]
        json: bool,
    },

    /// Rolling cycle (7/8-day) summary
    Cycle {
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        date: Option<String>,

        #[arg(long = "json")]
        json: bool,
    },

    /// Certify (sign) a daily log
    Certify {
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        date: String,

        #[arg(long = "signature")]
        signature: String,
    },

    /// List recorded violations
    Violations {
        #[arg(long = "from", value_name = "YYYY-MM-DD")]
        from: Option<String>,

        #[arg(long = "to", value_name = "YYYY-MM-DD")]
        to: Option<String>,
    },

    /// Rebuild a day's totals from its segments
    Recompute {
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DriverAction {
    /// Register a driver
    Add {
        name: String,

        #[arg(long = "schedule", help = "7_DAY (60h) or 8_DAY (70h); defaults to the configuration")]
        schedule: Option<String>,

        #[arg(long = "vehicle")]
        vehicle: Option<String>,
    },

    /// List registered drivers
    List,
}

/// Decimal hours, e.g. `5` or `2.5`.
pub fn parse_hours(s: &str) -> Result<Hours, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of hours", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{}' must be a non-negative number of hours", s));
    }
    Ok(Hours::from_hundredths((value * 100.0).round() as i64))
}
