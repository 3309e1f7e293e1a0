use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MalformedInputError, Result};
use crate::profiles::VarianceProfile;
use crate::seed::DEFAULT_MODEL;
use crate::types::ValueBounds;

/// Every constant the engine uses. One canonical set; there is no second
/// "model-aware" amplitude or slope.
///
/// Fields missing from a TOML override keep their canonical value. `profiles`
/// and `aliases` are replaced wholesale when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model used for "current value" lookups and series anchors.
    pub default_model: String,
    pub amplitude: f64,
    pub period_days: f64,
    /// AQI added per hour of offset.
    pub hour_slope: f64,
    pub point_bounds: ValueBounds,
    pub hourly_bounds: ValueBounds,
    /// Last-resort value when both prediction and simulation fail.
    pub safe_default_aqi: u32,
    pub default_profile: VarianceProfile,
    pub profiles: BTreeMap<String, VarianceProfile>,
    /// alias → canonical profile key.
    pub aliases: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl EngineConfig {
    pub fn canonical() -> Self {
        // ── Variance profiles ─────────────────────────────────────────────────
        // Noise grows with the model's real-world error: gbr is the best fit,
        // xgboost the worst. Salts keep identical keys apart across models.
        let profiles = BTreeMap::from([
            ("gbr".to_string(),     VarianceProfile { bias_offset: 0.0,  noise_std_dev: 5.0,  seed_salt: 1000 }),
            ("rf".to_string(),      VarianceProfile { bias_offset: -2.0, noise_std_dev: 8.0,  seed_salt: 2000 }),
            ("et".to_string(),      VarianceProfile { bias_offset: 3.0,  noise_std_dev: 12.0, seed_salt: 3000 }),
            ("xgboost".to_string(), VarianceProfile { bias_offset: 5.0,  noise_std_dev: 18.0, seed_salt: 4000 }),
        ]);

        let aliases = BTreeMap::from([
            ("gradient_boosting".to_string(), "gbr".to_string()),
            ("random_forest".to_string(),     "rf".to_string()),
            ("extra_trees".to_string(),       "et".to_string()),
        ]);

        EngineConfig {
            default_model: DEFAULT_MODEL.to_string(),
            amplitude: 25.0,
            period_days: 365.0,
            hour_slope: 0.3,
            point_bounds: ValueBounds::POINT,
            hourly_bounds: ValueBounds::HOURLY,
            safe_default_aqi: 45,
            default_profile: VarianceProfile::DEFAULT,
            profiles,
            aliases,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, MalformedInputError> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| MalformedInputError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), MalformedInputError> {
        let bad = |msg: String| Err(MalformedInputError::Config(msg));

        for (name, b) in [("point_bounds", self.point_bounds), ("hourly_bounds", self.hourly_bounds)] {
            if !(b.lower.is_finite() && b.upper.is_finite()) || b.lower > b.upper {
                return bad(format!("{name} [{}, {}] is not a closed interval", b.lower, b.upper));
            }
        }
        if !(self.period_days.is_finite() && self.period_days > 0.0) {
            return bad(format!("period_days must be positive, got {}", self.period_days));
        }
        if !(self.amplitude.is_finite() && self.hour_slope.is_finite()) {
            return bad("amplitude and hour_slope must be finite".to_string());
        }
        let all_profiles = std::iter::once((DEFAULT_MODEL, &self.default_profile))
            .chain(self.profiles.iter().map(|(k, v)| (k.as_str(), v)));
        for (name, p) in all_profiles {
            if !(p.noise_std_dev.is_finite() && p.noise_std_dev >= 0.0) {
                return bad(format!("profile {name}: noise_std_dev {} must be ≥ 0", p.noise_std_dev));
            }
            if !p.bias_offset.is_finite() {
                return bad(format!("profile {name}: bias_offset must be finite"));
            }
        }
        for (alias, target) in &self.aliases {
            if !self.profiles.contains_key(target) {
                return bad(format!("alias {alias} points at unknown profile {target}"));
            }
        }
        Ok(())
    }
}
