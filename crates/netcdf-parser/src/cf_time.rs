//! CF-convention time decoding (`<unit> since <reference>`).
//!
//! Only the standard (proleptic Gregorian) calendar is supported.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{NetCdfError, NetCdfResult};

const REFERENCE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Calendars that decode like the standard calendar.
const STANDARD_CALENDARS: &[&str] = &["standard", "gregorian", "proleptic_gregorian"];

/// Decoded `units` attribute of a time variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    seconds_per_unit: i64,
    reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> NetCdfResult<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| NetCdfError::TimeDecode(format!("no 'since' in units '{units}'")))?;

        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1,
            "minutes" | "minute" | "mins" | "min" => 60,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600,
            "days" | "day" | "d" => 86_400,
            other => {
                return Err(NetCdfError::TimeDecode(format!(
                    "unsupported time unit '{other}'"
                )))
            }
        };

        Ok(Self {
            seconds_per_unit,
            reference: parse_reference(reference.trim())?,
        })
    }

    /// Convert an offset in these units to an absolute UTC time.
    pub fn decode(&self, value: f64) -> NetCdfResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(NetCdfError::TimeDecode(format!("non-finite time value {value}")));
        }
        let out_of_range = || NetCdfError::TimeDecode(format!("time value {value} out of range"));

        let millis = (value * self.seconds_per_unit as f64 * 1000.0).round();
        if millis < i64::MIN as f64 || millis >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        let offset = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
        self.reference
            .checked_add_signed(offset)
            .ok_or_else(out_of_range)
    }
}

/// Reject calendars whose day counts differ from the Gregorian one.
pub fn check_calendar(calendar: Option<&str>) -> NetCdfResult<()> {
    match calendar {
        None => Ok(()),
        Some(c) if STANDARD_CALENDARS.contains(&c.trim().to_ascii_lowercase().as_str()) => Ok(()),
        Some(c) => Err(NetCdfError::TimeDecode(format!("unsupported calendar '{c}'"))),
    }
}

fn parse_reference(reference: &str) -> NetCdfResult<DateTime<Utc>> {
    let trimmed = reference
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    for format in REFERENCE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| NetCdfError::TimeDecode(format!("unparseable reference time '{reference}'")))
}
