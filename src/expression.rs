//! Timeout expressions such as `15m`, `2h`, `1d` and the special `1c`.

use chrono::{Local, TimeZone};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::error::ExpressionError;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn from_suffix(c: u8) -> Option<Self> {
        match c {
            b'm' => Some(TimeUnit::Minutes),
            b'h' => Some(TimeUnit::Hours),
            b'd' => Some(TimeUnit::Days),
            _ => None,
        }
    }

    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Minutes => SECONDS_PER_MINUTE,
            TimeUnit::Hours => SECONDS_PER_HOUR,
            TimeUnit::Days => SECONDS_PER_DAY,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            TimeUnit::Minutes => 'm',
            TimeUnit::Hours => 'h',
            TimeUnit::Days => 'd',
        }
    }
}

/// Lenient parse of a timeout expression into seconds.
///
/// Finds the first run of ASCII digits immediately followed by `m`, `h` or `d`
/// anywhere in the input and ignores everything around it. Returns `None` when
/// there is no such run, which is distinct from `Some(0)` for `"0m"`.
pub fn parse_timeout_express(expr: &str) -> Option<u64> {
    let bytes = expr.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        if let Some(unit) = bytes.get(i).copied().and_then(TimeUnit::from_suffix) {
            let value: u64 = expr[start..i].parse().ok()?;
            return value.checked_mul(unit.seconds());
        }
    }

    None
}

/// A timeout expression that passed the strict order-creation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutExpress {
    Span { value: u64, unit: TimeUnit },
    /// `1c`: the order closes at the end of the day it was created
    EndOfDay,
}

impl TimeoutExpress {
    /// Seconds from `created_millis` until the order expires.
    ///
    /// `None` only when `EndOfDay` cannot be resolved in the local time zone.
    pub fn total_seconds(&self, created_millis: i64) -> Option<u64> {
        match *self {
            // Overflow is ruled out when the value is parsed
            TimeoutExpress::Span { value, unit } => value.checked_mul(unit.seconds()),
            TimeoutExpress::EndOfDay => seconds_until_local_midnight(created_millis),
        }
    }
}

fn seconds_until_local_midnight(created_millis: i64) -> Option<u64> {
    let created = Local.timestamp_millis_opt(created_millis).single()?;
    let midnight = created.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?;
    let midnight = Local.from_local_datetime(&midnight).earliest()?;
    let secs = (midnight - created).num_seconds();
    Some(secs.max(0) as u64)
}

impl FromStr for TimeoutExpress {
    type Err = ExpressionError;

    /// `1c` is the only `c` form accepted. `2c` and up are rejected here
    /// instead of being passed on to the payment provider.
    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        if expr == "1c" {
            return Ok(TimeoutExpress::EndOfDay);
        }

        let Some((&last, prefix)) = expr.as_bytes().split_last() else {
            return Err(ExpressionError::InvalidUnit { expr: expr.to_string() });
        };
        let Some(unit) = TimeUnit::from_suffix(last) else {
            return Err(ExpressionError::InvalidUnit { expr: expr.to_string() });
        };

        // The suffix is ASCII so the prefix is still valid UTF-8
        let prefix = &expr[..prefix.len()];
        let value: i64 = prefix.parse().map_err(|e: std::num::ParseIntError| {
            match e.kind() {
                IntErrorKind::PosOverflow => ExpressionError::Overflow { expr: expr.to_string() },
                IntErrorKind::NegOverflow => ExpressionError::NotPositive { expr: expr.to_string() },
                _ => ExpressionError::NotAnInteger { expr: expr.to_string() },
            }
        })?;

        if value <= 0 {
            return Err(ExpressionError::NotPositive { expr: expr.to_string() });
        }

        let value = value as u64;
        if value.checked_mul(unit.seconds()).is_none() {
            return Err(ExpressionError::Overflow { expr: expr.to_string() });
        }

        Ok(TimeoutExpress::Span { value, unit })
    }
}

impl fmt::Display for TimeoutExpress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutExpress::Span { value, unit } => write!(f, "{}{}", value, unit.suffix()),
            TimeoutExpress::EndOfDay => write!(f, "1c"),
        }
    }
}
