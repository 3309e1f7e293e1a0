use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Error, MalformedInputError, PredictionError, Result};
use crate::performance::{self, ModelPerformance};
use crate::simulator::PointSimulator;
use crate::types::{DateKey, PointValue, Source, round_aqi};

/// A trained model supplied from outside the engine. Treated as read-only
/// once constructed; implementations must tolerate concurrent calls.
pub trait Predictor: Send + Sync {
    /// Models have been loaded at all.
    fn available(&self) -> bool;

    /// Loaded models are usable for scoring.
    fn ready(&self) -> bool;

    fn predict_point(&self, at: NaiveDateTime, model: &str) -> Result<f64, PredictionError>;

    /// Held-out metrics, if the predictor tracks them.
    fn performance(&self, _model: &str) -> Option<ModelPerformance> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    External,
    Simulated,
}

/// Chooses between the external predictor and the simulator.
///
/// Strategies run in order (external, simulated) and the first success
/// wins; if both fail the configured safe default is returned. Nothing is
/// cached: every call re-queries.
#[derive(Clone)]
pub struct Arbiter {
    predictor: Option<Arc<dyn Predictor>>,
    simulator: PointSimulator,
    default_model: String,
    safe_default: u32,
}

impl Arbiter {
    pub fn new(config: &EngineConfig) -> Self {
        Arbiter {
            predictor: None,
            simulator: PointSimulator::new(config),
            default_model: config.default_model.clone(),
            safe_default: config.safe_default_aqi,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn simulator(&self) -> &PointSimulator {
        &self.simulator
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn safe_default(&self) -> u32 {
        self.safe_default
    }

    /// Source the next call would try first.
    pub fn prediction_source(&self) -> Source {
        match &self.predictor {
            Some(p) if p.available() && p.ready() => Source::External,
            _ => Source::Simulated,
        }
    }

    /// Parses `date` and resolves a value. Only a malformed date fails, and it
    /// fails before anything is seeded or logged.
    pub fn get_value(
        &self,
        date: &str,
        offset_hours: u32,
        model: &str,
    ) -> Result<PointValue, MalformedInputError> {
        let date = DateKey::parse(date)?;
        Ok(self.value_for(date, offset_hours, model))
    }

    /// `get_value` for `default_model` at offset 0.
    pub fn current_value(&self, date: DateKey) -> PointValue {
        self.value_for(date, 0, &self.default_model)
    }

    /// Value for the day after `date`; the safe default when there is no
    /// next day on the calendar.
    pub fn next_day_value(&self, date: DateKey, model: &str) -> PointValue {
        match date.offset_days(1) {
            Some(next) => self.value_for(next, 0, model),
            None => PointValue { aqi: self.safe_default, source: Source::SafeDefault },
        }
    }

    pub fn value_for(&self, date: DateKey, offset_hours: u32, model: &str) -> PointValue {
        for strategy in [Strategy::External, Strategy::Simulated] {
            match self.attempt(strategy, date, offset_hours, model) {
                Ok(value) => {
                    debug!(%date, offset_hours, model, aqi = value.aqi, source = ?value.source, "point value");
                    return value;
                }
                Err(Error::Prediction(PredictionError::Unavailable)) => {}
                Err(e) => {
                    warn!(%date, offset_hours, model, ?strategy, error = %e, "strategy failed, falling back");
                }
            }
        }
        PointValue { aqi: self.safe_default, source: Source::SafeDefault }
    }

    fn attempt(
        &self,
        strategy: Strategy,
        date: DateKey,
        offset_hours: u32,
        model: &str,
    ) -> Result<PointValue> {
        match strategy {
            Strategy::External => {
                let aqi = self.external(date, offset_hours, model)?;
                Ok(PointValue { aqi, source: Source::External })
            }
            Strategy::Simulated => {
                let aqi = self.simulator.simulate(date, offset_hours, model)?;
                Ok(PointValue { aqi, source: Source::Simulated })
            }
        }
    }

    fn external(&self, date: DateKey, offset_hours: u32, model: &str) -> Result<u32, PredictionError> {
        let predictor = self.predictor.as_ref().ok_or(PredictionError::Unavailable)?;
        if !predictor.available() {
            return Err(PredictionError::Unavailable);
        }
        if !predictor.ready() {
            return Err(PredictionError::NotReady);
        }
        let model = self.simulator.profiles().canonical_name(model);
        let at = date
            .at_offset(offset_hours)
            .ok_or_else(|| PredictionError::TimestampOverflow { date: date.to_string(), offset_hours })?;
        let value = panic::catch_unwind(AssertUnwindSafe(|| predictor.predict_point(at, &model)))
            .map_err(|payload| PredictionError::Panicked(panic_message(payload.as_ref())))??;
        if !value.is_finite() {
            return Err(PredictionError::NonFinite(value));
        }
        Ok(round_aqi(value))
    }

    /// The predictor's own metrics, else the static table.
    pub fn performance(&self, model: &str) -> Option<ModelPerformance> {
        let model = self.simulator.profiles().canonical_name(model);
        self.predictor
            .as_ref()
            .filter(|p| p.available())
            .and_then(|p| p.performance(&model))
            .or_else(|| performance::fallback(&model))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
