use rand_distr::{Distribution, Normal};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::profiles::ProfileTable;
use crate::seasonal::SeasonalShape;
use crate::seed;
use crate::types::{DateKey, ValueBounds, round_aqi};

/// Deterministic fallback predictor.
///
/// Every call builds its own `ChaCha20Rng` from the composite key, so there
/// is no generator state shared between calls or threads.
#[derive(Debug, Clone)]
pub struct PointSimulator {
    shape: SeasonalShape,
    hour_slope: f64,
    bounds: ValueBounds,
    profiles: ProfileTable,
}

impl PointSimulator {
    pub fn new(config: &EngineConfig) -> Self {
        PointSimulator {
            shape: SeasonalShape { amplitude: config.amplitude, period_days: config.period_days },
            hour_slope: config.hour_slope,
            bounds: config.point_bounds,
            profiles: ProfileTable::from_config(config),
        }
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    pub fn bounds(&self) -> ValueBounds {
        self.bounds
    }

    /// Clamped, unrounded value for `(date, offset_hours, model)`.
    pub fn simulate_raw(&self, date: DateKey, offset_hours: u32, model: &str) -> Result<f64> {
        let model = self.profiles.canonical_name(model);
        let profile = self.profiles.profile(&model);

        let key = seed::composite_key(date, offset_hours, &model);
        let mut rng = seed::rng_for(&key, profile.seed_salt);

        let base = self.shape.shaped(date.day_of_year(), date.month());
        let noise = Normal::new(0.0, profile.noise_std_dev)
            .map_err(|e| Error::InvalidProfile { model: model.clone(), reason: e.to_string() })?
            .sample(&mut rng);
        let hour_effect = f64::from(offset_hours) * self.hour_slope;

        let raw = base + noise + hour_effect + profile.bias_offset;
        Ok(self.bounds.clamp(raw))
    }

    /// Integer AQI, rounded half-to-even.
    pub fn simulate(&self, date: DateKey, offset_hours: u32, model: &str) -> Result<u32> {
        self.simulate_raw(date, offset_hours, model).map(round_aqi)
    }

    /// Parses `date` first; a malformed date fails before any seeding.
    pub fn simulate_str(&self, date: &str, offset_hours: u32, model: &str) -> Result<u32> {
        let date = DateKey::parse(date)?;
        self.simulate(date, offset_hours, model)
    }
}
