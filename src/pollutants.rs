use rand::Rng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::category::{AqiCategory, categorize};
use crate::error::MalformedInputError;
use crate::predictor::Arbiter;
use crate::seasonal::Season;
use crate::seed;
use crate::types::{DateKey, days_in_month, round_concentration};

// Salts separating the per-date draws below; all share the date key.
const CONCENTRATION_SALT: u64 = 0;
const FORECAST_SALT: u64 = 100;
const CALENDAR_SALT: u64 = 200;
/// Per-pollutant spacing for the monthly highest-day draws.
const HIGHEST_DAY_SALT_STEP: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "O3")]
    Ozone,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "SO2")]
    So2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] =
        [Pollutant::Pm25, Pollutant::Pm10, Pollutant::Ozone, Pollutant::No2, Pollutant::Co, Pollutant::So2];

    /// Monitoring-network parameter name.
    pub fn parameter_name(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5 - Local Conditions",
            Pollutant::Pm10 => "PM10 Total 0-10um STP",
            Pollutant::Ozone => "Ozone",
            Pollutant::No2 => "Nitrogen dioxide (NO2)",
            Pollutant::Co => "Carbon monoxide",
            Pollutant::So2 => "Sulfur dioxide",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::Ozone => "O3",
            Pollutant::No2 => "NO2",
            Pollutant::Co => "CO",
            Pollutant::So2 => "SO2",
        }
    }

    /// Unit for display; gases other than CO are shown in ppb.
    pub fn display_unit(self) -> &'static str {
        match self {
            Pollutant::Pm25 | Pollutant::Pm10 => "µg/m³",
            Pollutant::Co => "ppm",
            Pollutant::Ozone | Pollutant::No2 | Pollutant::So2 => "ppb",
        }
    }

    /// Native concentration (µg/m³ or ppm) → display unit.
    pub fn to_display(self, native: f64) -> f64 {
        match self {
            Pollutant::Ozone | Pollutant::No2 | Pollutant::So2 => native * 1000.0,
            _ => native,
        }
    }
}

/// A concentration in display units, one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub pollutant: Pollutant,
    pub value: f64,
    pub unit: &'static str,
}

impl Reading {
    fn from_native(pollutant: Pollutant, native: f64) -> Self {
        Reading {
            pollutant,
            value: round_concentration(pollutant.to_display(native)),
            unit: pollutant.display_unit(),
        }
    }
}

/// Seasonal label for the dominant pollutant.
pub fn main_pollutant(date: DateKey) -> &'static str {
    match Season::of_month(date.month()) {
        Season::Winter => "PM2.5 - Winter Pollution",
        Season::Summer => "PM10 Total 0-10um STP",
        Season::Monsoon => "PM2.5 - Humid Conditions",
        Season::PostMonsoon => "PM2.5 - Local Conditions",
    }
}

/// Zero-mean gaussian draw; a degenerate σ yields no noise.
fn noise<R: Rng>(rng: &mut R, std_dev: f64) -> f64 {
    Normal::new(0.0, std_dev).map_or(0.0, |n| n.sample(rng))
}

/// Six concentrations scaled by `aqi / 50` with seeded noise and a floor
/// per pollutant. Deterministic for `(date, aqi)`.
pub fn concentrations(date: DateKey, aqi: u32) -> Vec<Reading> {
    let mut rng = seed::rng_for(&date.to_string(), CONCENTRATION_SALT);
    let scale = f64::from(aqi) / 50.0;

    // (pollutant, intercept, slope, noise σ, floor) in native units.
    let table = [
        (Pollutant::Pm25, 0.0, 15.0, 6.0, 5.0),
        (Pollutant::Pm10, 0.0, 25.0, 8.0, 10.0),
        (Pollutant::Ozone, 0.04, 0.01, 0.015, 0.02),
        (Pollutant::No2, 0.025, 0.005, 0.010, 0.01),
        (Pollutant::Co, 1.2, 0.3, 0.4, 0.3),
        (Pollutant::So2, 0.015, 0.005, 0.008, 0.005),
    ];

    table
        .iter()
        .map(|&(pollutant, intercept, slope, sigma, floor)| {
            let native = (intercept + slope * scale + noise(&mut rng, sigma)).max(floor);
            Reading::from_native(pollutant, native)
        })
        .collect()
}

/// Model-independent six-pollutant forecast for a date. Values are not
/// floored, matching the raw forecast chart.
pub fn forecast(date: DateKey) -> Vec<Reading> {
    let mut rng = seed::rng_for(&date.to_string(), FORECAST_SALT);
    let table = [
        (Pollutant::Pm25, 15.0, 8.0),
        (Pollutant::Pm10, 25.0, 12.0),
        (Pollutant::No2, 0.025, 0.012),
        (Pollutant::So2, 0.015, 0.006),
        (Pollutant::Co, 1.2, 0.5),
        (Pollutant::Ozone, 0.045, 0.018),
    ];
    table
        .iter()
        .map(|&(pollutant, mean, sigma)| Reading::from_native(pollutant, mean + noise(&mut rng, sigma)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighestDay {
    pub pollutant: Pollutant,
    pub day: u32,
    pub concentration: f64,
    pub unit: &'static str,
}

/// The day in `month` with the highest reading for each tracked pollutant.
pub fn highest_concentration_days(year: i32, month: u32) -> Result<Vec<HighestDay>, MalformedInputError> {
    let first = DateKey::from_ymd(year, month, 1)?;
    let key = first.0.format("%Y-%m").to_string();

    // (pollutant, base, σ) in display units.
    let table = [
        (Pollutant::Pm25, 32.0, 8.0),
        (Pollutant::Ozone, 58.0, 12.0),
        (Pollutant::No2, 28.0, 8.0),
        (Pollutant::So2, 16.0, 5.0),
        (Pollutant::Co, 1.2, 0.3),
    ];

    Ok(table
        .iter()
        .zip(0u64..)
        .map(|(&(pollutant, base, sigma), i)| {
            let mut rng = seed::rng_for(&key, i * HIGHEST_DAY_SALT_STEP);
            let day = rng.random_range(1..=28);
            let raw = base + noise(&mut rng, sigma);
            let concentration = match pollutant {
                Pollutant::Co => raw.clamp(0.3, 2.5),
                _ => raw.clamp(base * 0.5, base * 1.8),
            };
            HighestDay {
                pollutant,
                day,
                concentration: round_concentration(concentration),
                unit: pollutant.display_unit(),
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub aqi: u32,
    pub category: AqiCategory,
    pub main_pollutant: &'static str,
}

/// One entry per day of the month, valued through the arbiter's default model.
pub fn month_calendar(arbiter: &Arbiter, year: i32, month: u32) -> Result<Vec<CalendarDay>, MalformedInputError> {
    const CANDIDATES: [Pollutant; 4] = [Pollutant::Pm25, Pollutant::Ozone, Pollutant::No2, Pollutant::Pm10];

    let n = days_in_month(year, month)?;
    (1..=n)
        .map(|day| {
            let date = DateKey::from_ymd(year, month, day)?;
            let aqi = arbiter.current_value(date).aqi;
            let mut rng = seed::rng_for(&date.to_string(), CALENDAR_SALT);
            let main = CANDIDATES.choose(&mut rng).copied().unwrap_or(Pollutant::Pm25);
            Ok(CalendarDay { day, aqi, category: categorize(aqi), main_pollutant: main.short_name() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn date(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn main_pollutant_follows_season() {
        assert_eq!(main_pollutant(date("2024-01-10")), "PM2.5 - Winter Pollution");
        assert_eq!(main_pollutant(date("2024-04-10")), "PM10 Total 0-10um STP");
        assert_eq!(main_pollutant(date("2024-07-10")), "PM2.5 - Humid Conditions");
        assert_eq!(main_pollutant(date("2024-10-10")), "PM2.5 - Local Conditions");
    }

    #[test]
    fn concentrations_are_deterministic_and_floored() {
        let d = date("2024-02-02");
        let a = concentrations(d, 80);
        assert_eq!(a, concentrations(d, 80));
        assert_eq!(a.len(), 6);
        let floor = |p: Pollutant| match p {
            Pollutant::Pm25 => 5.0,
            Pollutant::Pm10 => 10.0,
            Pollutant::Ozone => 20.0,
            Pollutant::No2 => 10.0,
            Pollutant::Co => 0.3,
            Pollutant::So2 => 5.0,
        };
        for day in 0..60 {
            for r in concentrations(d.offset_days(day).unwrap(), 20) {
                assert!(r.value >= floor(r.pollutant), "{r:?}");
            }
        }
    }

    #[test]
    fn higher_aqi_raises_particulates_on_average() {
        let start = date("2024-01-01");
        let mean_pm25 = |aqi: u32| -> f64 {
            (0..100)
                .map(|i| concentrations(start.offset_days(i).unwrap(), aqi)[0].value)
                .sum::<f64>()
                / 100.0
        };
        assert!(mean_pm25(120) > mean_pm25(30));
    }

    #[test]
    fn gases_display_in_ppb() {
        let r = Reading::from_native(Pollutant::No2, 0.0314);
        assert_eq!(r.value, 31.4);
        assert_eq!(r.unit, "ppb");
        assert_eq!(Reading::from_native(Pollutant::Co, 1.26).value, 1.3);
    }

    #[test]
    fn forecast_has_six_pollutants() {
        let f = forecast(date("2024-05-05"));
        let names: Vec<&str> = f.iter().map(|r| r.pollutant.short_name()).collect();
        assert_eq!(names, ["PM2.5", "PM10", "NO2", "SO2", "CO", "O3"]);
        assert_eq!(f, forecast(date("2024-05-05")));
    }

    #[test]
    fn highest_days_within_month_and_clamped() {
        let days = highest_concentration_days(2024, 2).unwrap();
        assert_eq!(days.len(), 5);
        for h in &days {
            assert!((1..=28).contains(&h.day));
            match h.pollutant {
                Pollutant::Co => assert!((0.3..=2.5).contains(&h.concentration)),
                Pollutant::Pm25 => assert!((16.0..=57.6).contains(&h.concentration)),
                _ => {}
            }
        }
        assert_eq!(days, highest_concentration_days(2024, 2).unwrap());
    }

    #[test]
    fn highest_days_reject_bad_month() {
        assert!(highest_concentration_days(2024, 13).is_err());
    }

    #[test]
    fn calendar_matches_current_values() {
        let arbiter = Arbiter::new(&EngineConfig::canonical());
        let cal = month_calendar(&arbiter, 2024, 2).unwrap();
        assert_eq!(cal.len(), 29);
        for entry in &cal {
            let d = DateKey::from_ymd(2024, 2, entry.day).unwrap();
            assert_eq!(entry.aqi, arbiter.current_value(d).aqi);
            assert_eq!(entry.category, categorize(entry.aqi));
            assert!(["PM2.5", "O3", "NO2", "PM10"].contains(&entry.main_pollutant));
        }
    }

    #[test]
    fn pollutant_serializes_short_name() {
        assert_eq!(serde_json::to_string(&Pollutant::Pm25).unwrap(), r#""PM2.5""#);
    }
}
