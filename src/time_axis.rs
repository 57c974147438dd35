// src/time_axis.rs

//! Time points and the scales (lengthscales, periods) measured against them.
//!
//! A GP basis can be built over plain numbers (e.g. days-to-election) or over
//! calendar timestamps. On a datetime axis every scale must be a duration, on
//! a numeric axis every scale must be a bare number; mixing the two is an error
//! rather than a silent unit conversion.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GpBasisError;

const NANOS_PER_MICRO: f64 = 1e3;
const NANOS_PER_MILLI: f64 = 1e6;
const NANOS_PER_SECOND: f64 = 1e9;
const NANOS_PER_MINUTE: f64 = 60.0 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: f64 = 60.0 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: f64 = 24.0 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: f64 = 7.0 * NANOS_PER_DAY;

/// The time points a GP basis is evaluated at.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    /// Plain numeric time points, in whatever unit the caller uses.
    Numeric(Array1<f64>),
    /// Calendar timestamps. Scales on this axis must be durations.
    Datetime(Vec<NaiveDateTime>),
}

impl TimeAxis {
    /// Number of time points.
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Numeric(t) => t.len(),
            TimeAxis::Datetime(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self, TimeAxis::Datetime(_))
    }

    /// Checks that the axis is non-empty and, for numeric axes, finite.
    pub fn validate(&self) -> Result<(), GpBasisError> {
        if self.is_empty() {
            return Err(GpBasisError::InvalidInput(
                "time axis has zero points.".to_string(),
            ));
        }
        if let TimeAxis::Numeric(t) = self {
            if let Some(pos) = t.iter().position(|v| !v.is_finite()) {
                return Err(GpBasisError::InvalidInput(format!(
                    "time axis contains a non-finite value at index {}.",
                    pos
                )));
            }
        }
        Ok(())
    }

    /// Numeric view of the axis.
    ///
    /// Datetime axes are expressed in seconds since their earliest timestamp,
    /// which keeps pairwise differences exact to the nanosecond for any
    /// realistic campaign length.
    pub fn to_numeric(&self) -> Array1<f64> {
        match self {
            TimeAxis::Numeric(t) => t.clone(),
            TimeAxis::Datetime(t) => {
                let origin = match t.iter().min() {
                    Some(origin) => *origin,
                    None => return Array1::zeros(0),
                };
                t.iter()
                    .map(|ts| duration_to_seconds(ts.signed_duration_since(origin)))
                    .collect()
            }
        }
    }
}

impl From<Array1<f64>> for TimeAxis {
    fn from(t: Array1<f64>) -> Self {
        TimeAxis::Numeric(t)
    }
}

impl From<Vec<f64>> for TimeAxis {
    fn from(t: Vec<f64>) -> Self {
        TimeAxis::Numeric(Array1::from(t))
    }
}

impl From<Vec<NaiveDateTime>> for TimeAxis {
    fn from(t: Vec<NaiveDateTime>) -> Self {
        TimeAxis::Datetime(t)
    }
}

impl From<Vec<NaiveDate>> for TimeAxis {
    fn from(t: Vec<NaiveDate>) -> Self {
        TimeAxis::Datetime(t.into_iter().map(|d| d.and_time(chrono::NaiveTime::MIN)).collect())
    }
}

/// A lengthscale or a period.
///
/// In JSON configs a scale is either a number (`8`) or a duration string
/// (`"56D"`, `"8W"`, `"1 days 06:00:00"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScale", into = "RawScale")]
pub enum Scale {
    Numeric(f64),
    Duration(Duration),
}

impl Scale {
    /// Converts the scale into the units of `axis.to_numeric()`.
    pub fn resolve(&self, axis: &TimeAxis) -> Result<f64, GpBasisError> {
        let value = match (self, axis) {
            (Scale::Numeric(v), TimeAxis::Numeric(_)) => *v,
            (Scale::Duration(d), TimeAxis::Datetime(_)) => duration_to_seconds(*d),
            (Scale::Duration(d), TimeAxis::Numeric(_)) => {
                return Err(GpBasisError::UnitMismatch(format!(
                    "duration scale '{}' cannot be used on a numeric time axis.",
                    format_duration(*d)
                )))
            }
            (Scale::Numeric(v), TimeAxis::Datetime(_)) => {
                return Err(GpBasisError::UnitMismatch(format!(
                    "numeric scale {} cannot be used on a datetime axis; give a duration such as \"{}D\" instead.",
                    v, v
                )))
            }
        };
        if !value.is_finite() || value == 0.0 {
            return Err(GpBasisError::InvalidInput(format!(
                "scale must be finite and non-zero, got {}.",
                value
            )));
        }
        Ok(value)
    }
}

impl From<f64> for Scale {
    fn from(v: f64) -> Self {
        Scale::Numeric(v)
    }
}

impl From<Duration> for Scale {
    fn from(d: Duration) -> Self {
        Scale::Duration(d)
    }
}

impl FromStr for Scale {
    type Err = GpBasisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Scale::Duration)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Numeric(v) => write!(f, "{}", v),
            Scale::Duration(d) => write!(f, "{}", format_duration(*d)),
        }
    }
}

/// Wire form of [`Scale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawScale {
    Number(f64),
    Text(String),
}

impl TryFrom<RawScale> for Scale {
    type Error = GpBasisError;

    fn try_from(raw: RawScale) -> Result<Self, Self::Error> {
        match raw {
            RawScale::Number(v) => Ok(Scale::Numeric(v)),
            RawScale::Text(s) => s.parse(),
        }
    }
}

impl From<Scale> for RawScale {
    fn from(scale: Scale) -> Self {
        match scale {
            Scale::Numeric(v) => RawScale::Number(v),
            Scale::Duration(d) => RawScale::Text(format_duration(d)),
        }
    }
}

pub fn duration_to_seconds(d: Duration) -> f64 {
    d.num_seconds() as f64 + d.subsec_nanos() as f64 / NANOS_PER_SECOND
}

/// Formats a duration with the coarsest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    let nanos = match d.num_nanoseconds() {
        Some(n) => n,
        None => return format!("{}s", d.num_seconds()),
    };
    let units: [(i64, &str); 5] = [
        (NANOS_PER_DAY as i64, "D"),
        (NANOS_PER_HOUR as i64, "h"),
        (NANOS_PER_MINUTE as i64, "min"),
        (NANOS_PER_SECOND as i64, "s"),
        (1, "ns"),
    ];
    for (size, suffix) in units {
        if nanos % size == 0 {
            return format!("{}{}", nanos / size, suffix);
        }
    }
    format!("{}ns", nanos)
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "W" | "w" | "week" | "weeks" => NANOS_PER_WEEK,
        "D" | "d" | "day" | "days" => NANOS_PER_DAY,
        "h" | "H" | "hr" | "hour" | "hours" => NANOS_PER_HOUR,
        "m" | "min" | "T" | "minute" | "minutes" => NANOS_PER_MINUTE,
        "s" | "S" | "sec" | "second" | "seconds" => NANOS_PER_SECOND,
        "ms" | "L" | "milli" | "millis" | "milliseconds" => NANOS_PER_MILLI,
        "us" | "U" | "micro" | "micros" | "microseconds" => NANOS_PER_MICRO,
        "ns" | "N" | "nano" | "nanos" | "nanoseconds" => 1.0,
        _ => return None,
    };
    Some(nanos)
}

/// Parses a pandas-style timedelta string into a duration.
///
/// Accepts a sequence of `<number><unit>` tokens (`"8W"`, `"56D"`, `"1D12h"`,
/// `"2.5 days"`) optionally followed by a `hh:mm:ss[.fff]` clock component
/// (`"1 days 06:00:00"`). The total must be strictly positive.
pub fn parse_duration(input: &str) -> Result<Duration, GpBasisError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(GpBasisError::InvalidDuration("empty duration string.".to_string()));
    }

    let bytes = text.as_bytes();
    let mut pos = 0usize;
    let mut total_nanos = 0.0f64;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let number_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        if number_start == pos {
            return Err(GpBasisError::InvalidDuration(format!(
                "expected a number at position {} in '{}'.",
                number_start, input
            )));
        }
        let number: f64 = text[number_start..pos].parse().map_err(|_| {
            GpBasisError::InvalidDuration(format!(
                "'{}' is not a valid number in '{}'.",
                &text[number_start..pos],
                input
            ))
        })?;

        if pos < bytes.len() && bytes[pos] == b':' {
            let clock = &text[number_start..];
            let clock_end = clock.find(char::is_whitespace).unwrap_or(clock.len());
            total_nanos += parse_clock(&clock[..clock_end], input)?;
            pos = number_start + clock_end;
            continue;
        }

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let unit_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        let unit = &text[unit_start..pos];
        if unit.is_empty() {
            return Err(GpBasisError::InvalidDuration(format!(
                "missing unit after '{}' in '{}'.",
                number, input
            )));
        }
        let per_unit = unit_nanos(unit).ok_or_else(|| {
            GpBasisError::InvalidDuration(format!("unknown unit '{}' in '{}'.", unit, input))
        })?;
        total_nanos += number * per_unit;
    }

    if !(total_nanos > 0.0) {
        return Err(GpBasisError::InvalidDuration(format!(
            "duration '{}' must be strictly positive.",
            input
        )));
    }
    if total_nanos >= i64::MAX as f64 {
        return Err(GpBasisError::InvalidDuration(format!(
            "duration '{}' is out of range.",
            input
        )));
    }
    Ok(Duration::nanoseconds(total_nanos.round() as i64))
}

fn parse_clock(clock: &str, input: &str) -> Result<f64, GpBasisError> {
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(GpBasisError::InvalidDuration(format!(
            "clock component '{}' in '{}' must look like hh:mm:ss.",
            clock, input
        )));
    }
    let parse_part = |part: &str| -> Result<f64, GpBasisError> {
        part.parse::<f64>().map_err(|_| {
            GpBasisError::InvalidDuration(format!(
                "'{}' is not a valid clock field in '{}'.",
                part, input
            ))
        })
    };
    let hours = parse_part(parts[0])?;
    let minutes = parse_part(parts[1])?;
    let seconds = parse_part(parts[2])?;
    Ok(hours * NANOS_PER_HOUR + minutes * NANOS_PER_MINUTE + seconds * NANOS_PER_SECOND)
}
