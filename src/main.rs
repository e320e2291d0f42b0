//! rHOSlog main entrypoint.

use rhoslog::errors::AppError;
use rhoslog::run;
use rhoslog::ui::messages::{blocked, error};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RHOSLOG_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    println!();
    if let Err(e) = run() {
        match e {
            AppError::DrivingNotPermitted(_) => blocked(&e),
            _ => error(&e),
        }
        std::process::exit(1);
    }
}
