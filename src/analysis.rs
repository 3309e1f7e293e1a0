use crate::series::Series;
use crate::types::{PointValue, Source, ValueBounds};

/// Distribution summary for a run of values.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n − 1).
    pub std_dev: f64,
}

impl SeriesStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();

        let interp = |p: f64| -> f64 {
            let h = p * (n - 1) as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = h - lo as f64;
            sorted[lo] * (1.0 - frac) + sorted[hi] * frac
        };

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        Some(SeriesStats {
            n,
            min: sorted[0],
            p5: interp(0.05),
            p50: interp(0.50),
            p95: interp(0.95),
            max: sorted[n - 1],
            mean,
            std_dev: variance.sqrt(),
        })
    }

    pub fn from_aqi(values: &[u32]) -> Option<Self> {
        let values: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
        Self::from_values(&values)
    }
}

/// A broken series invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesViolation {
    WrongLength { expected: usize, actual: usize },
    /// Labels, values and sources disagree in length.
    RaggedColumns { labels: usize, values: usize, sources: usize },
    /// A non-external value escaped the bounds.
    OutOfBounds { index: usize, value: u32, lower: f64, upper: f64 },
    /// The pinned position differs from the independently computed current value.
    AnchorMismatch { index: usize, expected: u32, actual: u32 },
    AnchorOutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for SeriesViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongLength { expected, actual } => {
                write!(f, "WrongLength: expected={expected} actual={actual}")
            }
            Self::RaggedColumns { labels, values, sources } => {
                write!(f, "RaggedColumns: labels={labels} values={values} sources={sources}")
            }
            Self::OutOfBounds { index, value, lower, upper } => {
                write!(f, "OutOfBounds index={index}: {value} not in [{lower}, {upper}]")
            }
            Self::AnchorMismatch { index, expected, actual } => {
                write!(f, "AnchorMismatch index={index}: expected={expected} actual={actual}")
            }
            Self::AnchorOutOfRange { index, len } => {
                write!(f, "AnchorOutOfRange: index={index} len={len}")
            }
        }
    }
}

/// Check a generated series against the current value it should agree with.
///
/// `current` must come from a separate `Arbiter::get_value` call for the
/// anchor date; `bounds` applies to every value not produced externally.
pub fn verify_series(series: &Series, current: PointValue, bounds: ValueBounds) -> Vec<SeriesViolation> {
    let mut out = Vec::new();

    if let Some(expected) = series.kind.expected_len()
        && series.len() != expected
    {
        out.push(SeriesViolation::WrongLength { expected, actual: series.len() });
    }

    if series.labels.len() != series.values.len() || series.sources.len() != series.values.len() {
        out.push(SeriesViolation::RaggedColumns {
            labels: series.labels.len(),
            values: series.values.len(),
            sources: series.sources.len(),
        });
    }

    for (index, (&value, &source)) in series.values.iter().zip(&series.sources).enumerate() {
        if source != Source::External && !bounds.contains(f64::from(value)) {
            out.push(SeriesViolation::OutOfBounds { index, value, lower: bounds.lower, upper: bounds.upper });
        }
    }

    if let Some(index) = series.anchor_index {
        match series.values.get(index) {
            Some(&actual) if actual != current.aqi => {
                out.push(SeriesViolation::AnchorMismatch { index, expected: current.aqi, actual });
            }
            Some(_) => {}
            None => out.push(SeriesViolation::AnchorOutOfRange { index, len: series.len() }),
        }
    }

    out
}
