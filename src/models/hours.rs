//! Fixed-point duration used for every HOS quantity.
//!
//! The value is an integer count of seconds, so sums over many short
//! segments never drift. Rendering uses hundredths of an hour.

use chrono::TimeDelta;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

pub const SECS_PER_HOUR: i64 = 3_600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours(i64);

impl Hours {
    pub const ZERO: Hours = Hours(0);

    pub const fn from_secs(secs: i64) -> Self {
        Hours(secs)
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Hours(minutes * 60)
    }

    pub const fn from_hours(hours: i64) -> Self {
        Hours(hours * SECS_PER_HOUR)
    }

    /// Hundredths of an hour, e.g. `from_hundredths(1101)` is 11.01h.
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Hours(hundredths * 36)
    }

    pub fn from_delta(delta: TimeDelta) -> Self {
        Hours(delta.num_seconds())
    }

    pub const fn secs(self) -> i64 {
        self.0
    }

    pub const fn minutes(self) -> i64 {
        self.0 / 60
    }

    /// Hundredths of an hour, rounded half away from zero.
    pub fn hundredths(self) -> i64 {
        let scaled = self.0 * 100;
        let q = scaled / SECS_PER_HOUR;
        let r = scaled % SECS_PER_HOUR;
        if r.abs() * 2 >= SECS_PER_HOUR {
            q + self.0.signum()
        } else {
            q
        }
    }

    pub fn as_f64(self) -> f64 {
        self.hundredths() as f64 / 100.0
    }

    /// `self - other`, floored at zero.
    pub fn saturating_sub(self, other: Hours) -> Hours {
        Hours((self.0 - other.0).max(0))
    }

    pub fn clamp_non_negative(self) -> Hours {
        Hours(self.0.max(0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Hours {
    type Output = Hours;

    fn add(self, rhs: Hours) -> Hours {
        Hours(self.0 + rhs.0)
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Hours) {
        self.0 += rhs.0;
    }
}

impl Sub for Hours {
    type Output = Hours;

    fn sub(self, rhs: Hours) -> Hours {
        Hours(self.0 - rhs.0)
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Hours {
        iter.fold(Hours::ZERO, Add::add)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.hundredths();
        let sign = if h < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, h.abs() / 100, h.abs() % 100)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}
