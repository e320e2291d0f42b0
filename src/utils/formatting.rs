//! Formatting utilities used for CLI output.

use crate::models::duty_status::DutyStatus;
use crate::models::hours::Hours;
use ansi_term::Colour;

/// 7h 05m style rendering, with an optional explicit sign.
pub fn hours2readable(h: Hours, want_sign: bool) -> String {
    let mins = h.minutes();
    let abs_m = mins.abs();

    let sign = if mins > 0 && want_sign {
        "+"
    } else if mins < 0 {
        "-"
    } else {
        ""
    };

    format!("{}{:02}h {:02}m", sign, abs_m / 60, abs_m % 60)
}

/// Decimal hours with the "h" suffix, as printed on paper logs: `10.50h`.
pub fn decimal_hours(h: Hours) -> String {
    format!("{}h", h)
}

/// Label and colour for a duty status.
pub fn describe_status(status: DutyStatus) -> (String, Colour) {
    let colour = match status {
        DutyStatus::OffDuty => Colour::Green,
        DutyStatus::SleeperBerth => Colour::Blue,
        DutyStatus::Driving => Colour::Red,
        DutyStatus::OnDutyNotDriving => Colour::Yellow,
    };
    (status.label().to_string(), colour)
}

/// Remaining time is red at zero, yellow under one hour.
pub fn colour_for_remaining(h: Hours) -> Colour {
    if h.is_zero() {
        Colour::Red
    } else if h < Hours::from_hours(1) {
        Colour::Yellow
    } else {
        Colour::Green
    }
}
