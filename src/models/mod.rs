pub mod daily_log;
pub mod driver;
pub mod duty_status;
pub mod hours;
pub mod location;
pub mod schedule;
pub mod segment;
pub mod violation;
