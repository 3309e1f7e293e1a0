use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::SeriesStats;
use crate::config::EngineConfig;
use crate::error::{Error, MalformedInputError, SeriesPositionError};
use crate::predictor::Arbiter;
use crate::seed;
use crate::types::{DateKey, PointValue, Source, ValueBounds, days_in_month, round_aqi};

pub const DAILY_POSITIONS: usize = 365;
pub const WEEKS_PER_MONTH: usize = 4;
pub const MONTHS_PER_YEAR: usize = 12;
pub const HOURLY_SLOTS: [u32; 8] = [0, 3, 6, 9, 12, 15, 18, 21];
pub const MONTH_WINDOW_DAYS: u32 = 14;

/// Weekly representative days never exceed this, so every month has them.
const LAST_SAFE_DAY: u32 = 28;
const HOURLY_JITTER_SALT: u64 = 9000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// One value per day of the anchor year.
    DailyYear,
    /// 12 months × 4 weeks ending with the anchor month.
    WeeklyYear,
    /// Eight 3-hourly slots of the anchor date, shaped from the anchor value.
    HourlyDay,
    /// Seven days from the anchor date for one model.
    TrendWeek { model: String },
    /// A 14-day window of the anchor month containing the anchor day.
    MonthDays,
    /// Days 7, 14, 21 and 28 of the anchor month.
    MonthWeeks,
}

/// Time-of-day scaling for hourly values.
pub fn hour_multiplier(hour: u32) -> f64 {
    match hour {
        0 | 3 | 21 => 0.85, // night
        6 | 9 => 1.15,      // morning rush
        12 | 15 => 1.25,    // midday peak
        18 => 1.10,         // evening rush
        _ => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PositionSource {
    Point {
        date: Result<DateKey, SeriesPositionError>,
        /// (year, month) whose mid-month substitutes an invalid date.
        fallback: (i32, u32),
        offset_hours: u32,
    },
    Hour(u32),
}

#[derive(Debug, Clone, PartialEq)]
struct Position {
    label: String,
    source: PositionSource,
}

fn point(position: usize, year: i32, month: u32, day: u32, offset_hours: u32) -> PositionSource {
    let date = DateKey::from_ymd(year, month, day)
        .map_err(|_| SeriesPositionError { position, year, month, day });
    PositionSource::Point { date, fallback: (year, month), offset_hours }
}

/// Position → date mapping plus the index pinned to the anchor value.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    positions: Vec<Position>,
    anchor: Option<usize>,
    model: String,
}

impl SeriesKind {
    pub fn name(&self) -> &'static str {
        match self {
            SeriesKind::DailyYear => "daily_year",
            SeriesKind::WeeklyYear => "weekly_year",
            SeriesKind::HourlyDay => "hourly_day",
            SeriesKind::TrendWeek { .. } => "trend_week",
            SeriesKind::MonthDays => "month_days",
            SeriesKind::MonthWeeks => "month_weeks",
        }
    }

    /// Fixed length, where there is one.
    pub fn expected_len(&self) -> Option<usize> {
        match self {
            SeriesKind::DailyYear => Some(DAILY_POSITIONS),
            SeriesKind::WeeklyYear => Some(MONTHS_PER_YEAR * WEEKS_PER_MONTH),
            SeriesKind::HourlyDay => Some(HOURLY_SLOTS.len()),
            SeriesKind::TrendWeek { .. } => Some(7),
            SeriesKind::MonthWeeks => Some(WEEKS_PER_MONTH),
            SeriesKind::MonthDays => None,
        }
    }

    fn layout(&self, anchor: DateKey, default_model: &str) -> Layout {
        let (year, month, day) = (anchor.year(), anchor.month(), anchor.day());
        let model = match self {
            SeriesKind::TrendWeek { model } => model.clone(),
            _ => default_model.to_string(),
        };

        let (positions, anchor_index) = match self {
            SeriesKind::DailyYear => {
                let jan1 = anchor.offset_days(1 - i64::from(anchor.day_of_year()));
                let positions: Vec<Position> = (0..DAILY_POSITIONS)
                    .map(|i| match jan1.and_then(|d| d.offset_days(i as i64)) {
                        Some(d) => Position {
                            label: d.to_string(),
                            source: point(i, d.year(), d.month(), d.day(), 0),
                        },
                        None => Position {
                            label: format!("{year}+{i}"),
                            source: PositionSource::Point {
                                date: Err(SeriesPositionError { position: i, year, month: 1, day: i as u32 + 1 }),
                                fallback: (year, 1),
                                offset_hours: 0,
                            },
                        },
                    })
                    .collect();
                let index = anchor.day_of_year() as usize - 1;
                (positions, (index < DAILY_POSITIONS).then_some(index))
            }

            SeriesKind::WeeklyYear => {
                let base = year * 12 + month as i32 - 1;
                let mut positions = Vec::with_capacity(MONTHS_PER_YEAR * WEEKS_PER_MONTH);
                for month_offset in 0..MONTHS_PER_YEAR {
                    let idx = base - (MONTHS_PER_YEAR as i32 - 1) + month_offset as i32;
                    let (y, m) = (idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1);
                    for week in 0..WEEKS_PER_MONTH {
                        let position = month_offset * WEEKS_PER_MONTH + week;
                        let d = (1 + 7 * week as u32).min(LAST_SAFE_DAY);
                        positions.push(Position {
                            label: format!("{y}-{m:02} W{}", week + 1),
                            source: point(position, y, m, d, week as u32 * 24),
                        });
                    }
                }
                let week_in_month = ((day - 1) / 7).min(WEEKS_PER_MONTH as u32 - 1) as usize;
                let index = (MONTHS_PER_YEAR - 1) * WEEKS_PER_MONTH + week_in_month;
                (positions, Some(index))
            }

            SeriesKind::HourlyDay => {
                let positions: Vec<Position> = HOURLY_SLOTS
                    .iter()
                    .map(|&h| Position { label: format!("{h:02}:00"), source: PositionSource::Hour(h) })
                    .collect();
                (positions, None)
            }

            SeriesKind::TrendWeek { .. } => {
                let positions: Vec<Position> = (0..7)
                    .map(|i| match anchor.offset_days(i) {
                        Some(d) => Position {
                            label: d.0.format("%m-%d").to_string(),
                            source: point(i as usize, d.year(), d.month(), d.day(), 0),
                        },
                        None => Position {
                            label: format!("+{i}"),
                            source: PositionSource::Point {
                                date: Err(SeriesPositionError { position: i as usize, year, month, day }),
                                fallback: (year, month),
                                offset_hours: 0,
                            },
                        },
                    })
                    .collect();
                (positions, Some(0))
            }

            SeriesKind::MonthDays => {
                let n = days_in_month(year, month).unwrap_or(LAST_SAFE_DAY);
                let start = day.saturating_sub(6).max(1);
                let end = (start + MONTH_WINDOW_DAYS - 1).min(n);
                let start = end.saturating_sub(MONTH_WINDOW_DAYS - 1).max(1);
                let positions: Vec<Position> = (start..=end)
                    .enumerate()
                    .map(|(i, d)| Position {
                        label: format!("{year}-{month:02}-{d:02}"),
                        source: point(i, year, month, d, 0),
                    })
                    .collect();
                (positions, Some((day - start) as usize))
            }

            SeriesKind::MonthWeeks => {
                let positions: Vec<Position> = (0..WEEKS_PER_MONTH)
                    .map(|w| {
                        let d = (7 * (w as u32 + 1)).min(LAST_SAFE_DAY);
                        Position { label: format!("Week {}", w + 1), source: point(w, year, month, d, 0) }
                    })
                    .collect();
                let index = (day % 7 == 0 && day <= LAST_SAFE_DAY).then(|| day as usize / 7 - 1);
                (positions, index)
            }
        };

        Layout { positions, anchor: anchor_index, model }
    }
}

/// An ordered run of AQI values with its anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub kind: SeriesKind,
    pub anchor_date: DateKey,
    /// Position forced to `anchor_value`; `None` when no position stands for
    /// the anchor date (hourly slots, Dec 31 of a leap year, off-grid days).
    pub anchor_index: Option<usize>,
    pub anchor_value: PointValue,
    pub labels: Vec<String>,
    pub values: Vec<u32>,
    pub sources: Vec<Source>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> Option<SeriesStats> {
        SeriesStats::from_aqi(&self.values)
    }
}

/// Builds every series kind through one code path: lay out positions, pin
/// the anchor, ask the arbiter for everything else.
#[derive(Clone)]
pub struct SeriesGenerator {
    arbiter: Arbiter,
    hourly_bounds: ValueBounds,
}

impl SeriesGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_arbiter(Arbiter::new(config), config)
    }

    pub fn with_arbiter(arbiter: Arbiter, config: &EngineConfig) -> Self {
        SeriesGenerator { arbiter, hourly_bounds: config.hourly_bounds }
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn hourly_bounds(&self) -> ValueBounds {
        self.hourly_bounds
    }

    pub fn generate_str(&self, kind: &SeriesKind, anchor: &str) -> Result<Series, MalformedInputError> {
        let anchor = DateKey::parse(anchor)?;
        Ok(self.generate(kind, anchor))
    }

    pub fn generate(&self, kind: &SeriesKind, anchor: DateKey) -> Series {
        let layout = kind.layout(anchor, self.arbiter.default_model());
        let anchor_value = self.arbiter.value_for(anchor, 0, &layout.model);

        let (values, sources): (Vec<u32>, Vec<Source>) = layout
            .positions
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                if layout.anchor == Some(i) {
                    return (anchor_value.aqi, anchor_value.source);
                }
                self.evaluate(&p.source, anchor, anchor_value, &layout.model)
            })
            .unzip();

        let series = Series {
            kind: kind.clone(),
            anchor_date: anchor,
            anchor_index: layout.anchor,
            anchor_value,
            labels: layout.positions.into_iter().map(|p| p.label).collect(),
            values,
            sources,
        };

        if let Some(stats) = series.stats() {
            info!(
                kind = kind.name(),
                %anchor,
                points = series.len(),
                anchor_index = ?series.anchor_index,
                anchor_aqi = anchor_value.aqi,
                min = stats.min,
                max = stats.max,
                "series generated"
            );
        }
        series
    }

    fn evaluate(
        &self,
        source: &PositionSource,
        anchor: DateKey,
        anchor_value: PointValue,
        model: &str,
    ) -> (u32, Source) {
        match source {
            PositionSource::Point { date: Ok(date), offset_hours, .. } => {
                let v = self.arbiter.value_for(*date, *offset_hours, model);
                (v.aqi, v.source)
            }
            PositionSource::Point { date: Err(e), fallback: (year, month), offset_hours } => {
                warn!(error = %e, "substituting mid-month date");
                self.mid_month_value(*year, *month, *offset_hours, model)
            }
            PositionSource::Hour(hour) => {
                (self.hourly_value(anchor_value.aqi, anchor, *hour, model), anchor_value.source)
            }
        }
    }

    /// Plain simulation on the 15th; safe default if even that fails.
    fn mid_month_value(&self, year: i32, month: u32, offset_hours: u32, model: &str) -> (u32, Source) {
        let simulated = DateKey::mid_month(year, month)
            .map_err(Error::from)
            .and_then(|d| self.arbiter.simulator().simulate(d, offset_hours, model));
        match simulated {
            Ok(aqi) => (aqi, Source::Simulated),
            Err(e) => {
                warn!(year, month, error = %e, "mid-month substitute failed");
                (self.arbiter.safe_default(), Source::SafeDefault)
            }
        }
    }

    /// `base × time-of-day multiplier × jitter∈[0.9, 1.1]`, clamped to the
    /// hourly bounds. The jitter is seeded from `(date, hour, model)`.
    pub fn hourly_value(&self, base: u32, date: DateKey, hour: u32, model: &str) -> u32 {
        let model = self.arbiter.simulator().profiles().canonical_name(model);
        let mut rng = seed::rng_for(&seed::composite_key(date, hour, &model), HOURLY_JITTER_SALT);
        let jitter: f64 = rng.random_range(0.9..=1.1);
        round_aqi(self.hourly_bounds.clamp(f64::from(base) * hour_multiplier(hour) * jitter))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::PredictionError;
    use crate::predictor::fakes::{FixedPredictor, PanickingPredictor};

    fn generator() -> SeriesGenerator {
        SeriesGenerator::new(&EngineConfig::canonical())
    }

    fn date(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn daily_year_scenario() {
        let g = generator();
        let anchor = date("2024-03-15");
        let series = g.generate(&SeriesKind::DailyYear, anchor);

        assert_eq!(series.len(), 365);
        let idx = anchor.day_of_year() as usize - 1;
        assert_eq!(series.anchor_index, Some(idx));
        let current = g.arbiter().get_value("2024-03-15", 0, "default").unwrap();
        assert_eq!(series.values[idx], current.aqi);
        assert!(series.values.iter().all(|v| (20..=120).contains(v)));
        assert_eq!(series.labels[0], "2024-01-01");
        assert_eq!(series.labels[364], "2024-12-30");
    }

    #[test]
    fn daily_year_non_anchor_positions_use_their_own_dates() {
        let g = generator();
        let series = g.generate(&SeriesKind::DailyYear, date("2023-06-01"));
        let arb = g.arbiter();
        for i in [0usize, 100, 364] {
            let d = date("2023-01-01").offset_days(i as i64).unwrap();
            assert_eq!(series.values[i], arb.current_value(d).aqi, "position {i}");
        }
    }

    #[test]
    fn leap_year_last_day_has_no_anchor() {
        let series = generator().generate(&SeriesKind::DailyYear, date("2024-12-31"));
        assert_eq!(series.len(), 365);
        assert_eq!(series.anchor_index, None);
    }

    #[test]
    fn weekly_year_anchor_is_current_week_of_last_month() {
        let g = generator();
        let anchor = date("2024-03-15");
        let series = g.generate(&SeriesKind::WeeklyYear, anchor);
        assert_eq!(series.len(), 48);
        assert_eq!(series.anchor_index, Some(46));
        assert_eq!(series.values[46], g.arbiter().current_value(anchor).aqi);
        assert_eq!(series.labels[0], "2023-04 W1");
        assert_eq!(series.labels[47], "2024-03 W4");
    }

    #[test]
    fn weekly_year_rolls_back_across_year_boundary() {
        let series = generator().generate(&SeriesKind::WeeklyYear, date("2024-01-31"));
        assert_eq!(series.labels[0], "2023-02 W1");
        assert_eq!(series.labels[44], "2024-01 W1");
        // Day 31 lands in the fourth week, not a fifth.
        assert_eq!(series.anchor_index, Some(47));
    }

    #[test]
    fn weekly_year_positions_use_week_offsets() {
        let g = generator();
        let series = g.generate(&SeriesKind::WeeklyYear, date("2024-03-01"));
        // Position 2: April 2023, week 3 → day 15, offset 48h.
        let expected = g.arbiter().value_for(date("2023-04-15"), 48, "default");
        assert_eq!(series.values[2], expected.aqi);
    }

    #[test]
    fn hourly_day_is_bounded_and_deterministic() {
        let g = generator();
        let a = g.generate(&SeriesKind::HourlyDay, date("2024-11-20"));
        let b = g.generate(&SeriesKind::HourlyDay, date("2024-11-20"));
        assert_eq!(a.values, b.values);
        assert_eq!(a.len(), 8);
        assert_eq!(a.anchor_index, None);
        assert_eq!(a.labels[4], "12:00");
        assert!(a.values.iter().all(|v| (20..=110).contains(v)));
    }

    #[test]
    fn hourly_value_respects_multiplier_envelope() {
        let g = generator();
        let d = date("2024-05-05");
        for &h in &HOURLY_SLOTS {
            let v = f64::from(g.hourly_value(60, d, h, "default"));
            let m = hour_multiplier(h);
            assert!(v >= (60.0 * m * 0.9).floor() && v <= (60.0 * m * 1.1).ceil(), "hour {h}: {v}");
        }
    }

    #[test]
    fn hourly_value_clamps_to_hourly_bounds() {
        let g = generator();
        let d = date("2024-05-05");
        assert_eq!(g.hourly_value(500, d, 12, "default"), 110);
        assert_eq!(g.hourly_value(1, d, 0, "default"), 20);
    }

    #[test]
    fn trend_week_pins_first_day_for_model() {
        let g = generator();
        let kind = SeriesKind::TrendWeek { model: "xgboost".to_string() };
        let series = g.generate(&kind, date("2024-08-30"));
        assert_eq!(series.len(), 7);
        assert_eq!(series.values[0], g.arbiter().get_value("2024-08-30", 0, "xgboost").unwrap().aqi);
        assert_eq!(series.labels[2], "09-01");
    }

    #[test]
    fn month_days_window_contains_anchor() {
        let g = generator();
        let series = g.generate(&SeriesKind::MonthDays, date("2024-02-27"));
        assert_eq!(series.len(), 14);
        assert_eq!(series.labels[0], "2024-02-16");
        assert_eq!(series.labels[13], "2024-02-29");
        let idx = series.anchor_index.unwrap();
        assert_eq!(series.labels[idx], "2024-02-27");

        let early = g.generate(&SeriesKind::MonthDays, date("2024-02-01"));
        assert_eq!(early.labels[0], "2024-02-01");
        assert_eq!(early.labels[13], "2024-02-14");
        assert_eq!(early.anchor_index, Some(0));
    }

    #[test]
    fn month_weeks_anchor_only_on_grid_days() {
        let g = generator();
        assert_eq!(g.generate(&SeriesKind::MonthWeeks, date("2024-04-14")).anchor_index, Some(1));
        assert_eq!(g.generate(&SeriesKind::MonthWeeks, date("2024-04-15")).anchor_index, None);
        assert_eq!(g.generate(&SeriesKind::MonthWeeks, date("2024-04-28")).anchor_index, Some(3));
    }

    #[test]
    fn invalid_position_falls_back_to_mid_month() {
        let g = generator();
        let source = point(3, 2023, 2, 30, 24);
        assert!(matches!(&source, PositionSource::Point { date: Err(_), .. }));
        let anchor = date("2023-02-01");
        let (aqi, src) = g.evaluate(&source, anchor, g.arbiter().current_value(anchor), "default");
        assert_eq!(src, Source::Simulated);
        assert_eq!(aqi, g.arbiter().simulator().simulate(date("2023-02-15"), 24, "default").unwrap());
    }

    #[test]
    fn anchor_consistent_when_predictor_succeeds() {
        let arbiter = Arbiter::new(&EngineConfig::canonical())
            .with_predictor(Arc::new(FixedPredictor::ok(72.4)));
        let g = SeriesGenerator::with_arbiter(arbiter, &EngineConfig::canonical());
        let series = g.generate(&SeriesKind::WeeklyYear, date("2024-09-09"));
        let idx = series.anchor_index.unwrap();
        assert_eq!(series.values[idx], 72);
        assert_eq!(series.sources[idx], Source::External);
    }

    #[test]
    fn anchor_consistent_when_predictor_fails() {
        let failure = PredictionError::Model { model: "default".into(), reason: "shape mismatch".into() };
        let arbiter = Arbiter::new(&EngineConfig::canonical())
            .with_predictor(Arc::new(FixedPredictor::failing(failure)));
        let g = SeriesGenerator::with_arbiter(arbiter, &EngineConfig::canonical());
        let anchor = date("2024-09-09");
        let series = g.generate(&SeriesKind::DailyYear, anchor);
        let idx = series.anchor_index.unwrap();
        assert_eq!(series.values[idx], g.arbiter().current_value(anchor).aqi);
        assert!(series.sources.iter().all(|s| *s == Source::Simulated));
    }

    #[test]
    fn panicking_predictor_leaves_series_simulated() {
        let arbiter = Arbiter::new(&EngineConfig::canonical()).with_predictor(Arc::new(PanickingPredictor));
        let g = SeriesGenerator::with_arbiter(arbiter, &EngineConfig::canonical());
        let anchor = date("2024-03-15");
        let series = g.generate(&SeriesKind::DailyYear, anchor);
        assert_eq!(series.len(), DAILY_POSITIONS);
        assert!(series.sources.iter().all(|s| *s == Source::Simulated));
        assert_eq!(series.values, generator().generate(&SeriesKind::DailyYear, anchor).values);
    }

    #[test]
    fn generate_str_rejects_malformed_anchor() {
        assert!(generator().generate_str(&SeriesKind::DailyYear, "2024-13-40").is_err());
    }
}
