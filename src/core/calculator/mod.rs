pub mod breaks;
pub mod cycle;
pub mod rest;
pub mod totals;

pub use breaks::{BreakStatus, break_status};
pub use cycle::{CycleTotals, cycle_totals};
pub use rest::{RestStatus, rest_status};
pub use totals::{DailyTotals, daily_totals};
