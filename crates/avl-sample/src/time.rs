use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::errors::{Result, SampleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

/// A fixed time step such as `1D`, `6H`, `30min` or `10S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResolution {
    pub count: i64,
    pub unit: TimeUnit,
}

impl TimeResolution {
    pub fn duration(&self) -> Result<TimeDelta> {
        let delta = match self.unit {
            TimeUnit::Week => TimeDelta::try_weeks(self.count),
            TimeUnit::Day => TimeDelta::try_days(self.count),
            TimeUnit::Hour => TimeDelta::try_hours(self.count),
            TimeUnit::Minute => TimeDelta::try_minutes(self.count),
            TimeUnit::Second => TimeDelta::try_seconds(self.count),
        };
        delta.ok_or_else(|| SampleError::Time(format!("time step {} out of range", self.count)))
    }

    /// ISO 8601 duration, e.g. `P1D` or `PT30M`.
    pub fn to_iso8601(&self) -> String {
        match self.unit {
            TimeUnit::Week => format!("P{}W", self.count),
            TimeUnit::Day => format!("P{}D", self.count),
            TimeUnit::Hour => format!("PT{}H", self.count),
            TimeUnit::Minute => format!("PT{}M", self.count),
            TimeUnit::Second => format!("PT{}S", self.count),
        }
    }
}

impl FromStr for TimeResolution {
    type Err = SampleError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || SampleError::Time(format!("invalid time resolution '{value}'"));
        let split = value
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (count, unit) = value.split_at(split);
        let count = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| invalid())?
        };
        let unit = match unit {
            "W" | "w" => TimeUnit::Week,
            "D" | "d" => TimeUnit::Day,
            "H" | "h" => TimeUnit::Hour,
            "min" | "T" => TimeUnit::Minute,
            "S" | "s" => TimeUnit::Second,
            _ => return Err(invalid()),
        };
        if count <= 0 {
            return Err(invalid());
        }
        Ok(Self { count, unit })
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS` (optionally with `Z`) or `YYYY-MM-DD` as UTC.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim_end_matches('Z');
    if let Ok(time) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(time.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| SampleError::Time(format!("invalid time '{value}'")))
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// ISO 8601 duration of a non-negative delta, e.g. `P5D` or `P1DT6H`.
pub fn iso8601_duration(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    let mut text = String::from("P");
    if days > 0 {
        text.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        text.push('T');
        if hours > 0 {
            text.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            text.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 {
            text.push_str(&format!("{seconds}S"));
        }
    }
    if text == "P" {
        text.push_str("T0S");
    }
    text
}
