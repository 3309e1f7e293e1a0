use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::MalformedInputError;

/// Calendar date used as a seeding key.
/// Always rendered as `YYYY-MM-DD`, so `2024-1-5` and `2024-01-05` seed
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DateKey(pub NaiveDate);

impl DateKey {
    pub fn parse(s: &str) -> Result<Self, MalformedInputError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(DateKey)
            .map_err(|_| MalformedInputError::Date(s.to_string()))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, MalformedInputError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(DateKey)
            .ok_or(MalformedInputError::OutOfRange { year, month, day })
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// 1-based; 366 on Dec 31 of a leap year.
    pub fn day_of_year(self) -> u32 {
        self.0.ordinal()
    }

    pub fn offset_days(self, days: i64) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(days)).map(DateKey)
    }

    /// Midnight of this date shifted forward by `hours`; `None` past the
    /// end of the calendar.
    pub fn at_offset(self, hours: u32) -> Option<NaiveDateTime> {
        self.0.and_time(chrono::NaiveTime::MIN).checked_add_signed(Duration::hours(i64::from(hours)))
    }

    /// Mid-month substitute used when a synthesized date is invalid.
    pub fn mid_month(year: i32, month: u32) -> Result<Self, MalformedInputError> {
        Self::from_ymd(year, month, 15)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, MalformedInputError> {
    let first = DateKey::from_ymd(year, month, 1)?;
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let next = DateKey::from_ymd(ny, nm, 1)?;
    Ok((next.0 - first.0).num_days() as u32)
}

/// Closed interval every emitted value is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueBounds {
    pub lower: f64,
    pub upper: f64,
}

impl ValueBounds {
    pub const POINT: ValueBounds = ValueBounds { lower: 20.0, upper: 120.0 };
    pub const HOURLY: ValueBounds = ValueBounds { lower: 20.0, upper: 110.0 };

    /// NaN clamps to the lower bound.
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return self.lower;
        }
        value.clamp(self.lower, self.upper)
    }

    pub fn contains(self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Which strategy produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    External,
    Simulated,
    SafeDefault,
}

/// An AQI value together with the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointValue {
    pub aqi: u32,
    pub source: Source,
}

/// Integer AQI rounding: half-to-even.
pub fn round_aqi(value: f64) -> u32 {
    value.max(0.0).round_ties_even() as u32
}

/// Concentrations keep one decimal place.
pub fn round_concentration(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_to_canonical_form() {
        let a = DateKey::parse("2024-1-5").unwrap();
        let b = DateKey::parse("2024-01-05").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2024-01-05");
    }

    #[test]
    fn parse_rejects_impossible_date() {
        let err = DateKey::parse("2024-13-40").unwrap_err();
        assert_eq!(err, MalformedInputError::Date("2024-13-40".to_string()));
        assert!(DateKey::parse("2023-02-29").is_err());
        assert!(DateKey::parse("yesterday").is_err());
    }

    #[test]
    fn day_of_year_is_one_based() {
        assert_eq!(DateKey::parse("2024-01-01").unwrap().day_of_year(), 1);
        assert_eq!(DateKey::parse("2024-03-15").unwrap().day_of_year(), 75);
        assert_eq!(DateKey::parse("2024-12-31").unwrap().day_of_year(), 366);
    }

    #[test]
    fn at_offset_rolls_into_next_day() {
        let d = DateKey::parse("2024-01-05").unwrap();
        assert_eq!(d.at_offset(30).unwrap().to_string(), "2024-01-06 06:00:00");
    }

    #[test]
    fn at_offset_past_calendar_end_is_none() {
        assert!(DateKey(NaiveDate::MAX).at_offset(24).is_none());
        assert!(DateKey(NaiveDate::MAX).at_offset(0).is_some());
        assert!(DateKey::parse("2024-01-05").unwrap().at_offset(u32::MAX).is_none());
    }

    #[test]
    fn days_in_month_handles_leap_february() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2023, 12).unwrap(), 31);
        assert!(days_in_month(2023, 13).is_err());
    }

    #[test]
    fn bounds_clamp_extremes_and_nan() {
        let b = ValueBounds::POINT;
        assert_eq!(b.clamp(-1e9), 20.0);
        assert_eq!(b.clamp(1e9), 120.0);
        assert_eq!(b.clamp(f64::NAN), 20.0);
        assert_eq!(b.clamp(64.5), 64.5);
    }

    #[test]
    fn round_aqi_is_half_to_even() {
        assert_eq!(round_aqi(44.5), 44);
        assert_eq!(round_aqi(45.5), 46);
        assert_eq!(round_aqi(45.49), 45);
    }

    #[test]
    fn round_concentration_keeps_one_decimal() {
        assert_eq!(round_concentration(12.345), 12.3);
        assert_eq!(round_concentration(0.96), 1.0);
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&PointValue { aqi: 42, source: Source::SafeDefault }).unwrap();
        assert_eq!(json, r#"{"aqi":42,"source":"safe_default"}"#);
    }
}
