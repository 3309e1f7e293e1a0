use thiserror::Error;

/// Caller-supplied input that cannot be turned into a date, month, or
/// configuration. Never recovered inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInputError {
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    Date(String),
    #[error("date out of range: {year}-{month:02}-{day:02}")]
    OutOfRange { year: i32, month: u32, day: u32 },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure of the external predictor. Always recovered by falling back to
/// simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("external predictor is not loaded")]
    Unavailable,
    #[error("external predictor is loaded but not ready")]
    NotReady,
    #[error("model {model} failed: {reason}")]
    Model { model: String, reason: String },
    #[error("model {model} is missing feature {feature}")]
    MissingFeature { model: String, feature: String },
    #[error("external predictor returned non-finite value {0}")]
    NonFinite(f64),
    #[error("{date} + {offset_hours}h is past the end of the calendar")]
    TimestampOverflow { date: String, offset_hours: u32 },
    #[error("external predictor panicked: {0}")]
    Panicked(String),
}

/// A synthesized series date that does not exist on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("series position {position} has no valid date {year}-{month:02}-{day:02}")]
pub struct SeriesPositionError {
    pub position: usize,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MalformedInput(#[from] MalformedInputError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error("variance profile for {model} is unusable: {reason}")]
    InvalidProfile { model: String, reason: String },
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
