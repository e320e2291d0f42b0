use crate::models::violation::Severity;
use ansi_term::{Colour, Style};
use std::fmt;

/// Icons
const ICON_INFO: &str = "ℹ️";
const ICON_OK: &str = "✅";
const ICON_WARN: &str = "⚠️";
const ICON_ERR: &str = "❌";
const ICON_BLOCK: &str = "⛔";

fn icon(colour: Colour, icon: &str) -> String {
    colour.bold().paint(icon).to_string()
}

pub fn info<T: fmt::Display>(msg: T) {
    println!("{} {}", icon(Colour::Blue, ICON_INFO), msg);
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{} {}", icon(Colour::Green, ICON_OK), msg);
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{} {}", icon(Colour::Yellow, ICON_WARN), msg);
}

pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{} {}", icon(Colour::Red, ICON_ERR), msg);
}

/// Driving refused by the rules; printed on stderr like an error.
pub fn blocked<T: fmt::Display>(msg: T) {
    eprintln!("{} {}", icon(Colour::Red, ICON_BLOCK), msg);
}

/// One violation line, coloured by severity.
pub fn violation<T: fmt::Display>(severity: Severity, msg: T) {
    let colour = match severity {
        Severity::Low => Colour::White,
        Severity::Medium => Colour::Yellow,
        Severity::High => Colour::Red,
        Severity::Critical => Colour::Purple,
    };
    println!(
        "{} {} {}",
        icon(colour, ICON_WARN),
        colour.paint(format!("[{}]", severity.to_db_str())),
        msg
    );
}

/// Section header
pub fn header<T: fmt::Display>(msg: T) {
    println!(
        "{}",
        Style::new()
            .bold()
            .fg(Colour::Blue)
            .paint(format!("====================== {}\n", msg))
    );
}

/// Aligned `label: value` row.
pub fn field<T: fmt::Display>(label: &str, value: T) {
    println!("  {:<22} {}", format!("{}:", label), value);
}
