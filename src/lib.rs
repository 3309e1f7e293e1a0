//! Deterministic AQI values and chart series.
//!
//! Every value is a pure function of `(date, offset_hours, model)`: an
//! external predictor is consulted first when one is attached, otherwise a
//! seeded seasonal simulator fills in, and a configured constant covers the
//! case where both fail. Series generators pin the anchor position to the
//! same value a standalone lookup returns.

pub mod advice;
pub mod analysis;
pub mod category;
pub mod config;
pub mod error;
pub mod performance;
pub mod pollutants;
pub mod predictor;
pub mod profiles;
pub mod seasonal;
pub mod seed;
pub mod series;
pub mod simulator;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use predictor::{Arbiter, Predictor};
pub use series::{Series, SeriesGenerator, SeriesKind};
pub use types::{DateKey, PointValue, Source};
