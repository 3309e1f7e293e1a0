use serde::Serialize;

/// Held-out accuracy metrics for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub r2_score: f64,
    pub mae: f64,
    pub rmse: f64,
    /// Percent.
    pub mape: f64,
}

impl ModelPerformance {
    pub fn accuracy_percentage(&self) -> f64 {
        (self.r2_score * 1000.0).round() / 10.0
    }
}

/// Published metrics for the shipped models, reported when the external
/// predictor cannot supply its own. Keyed by canonical model name.
pub fn fallback(model: &str) -> Option<ModelPerformance> {
    let m = |r2_score, mae, rmse, mape| ModelPerformance { r2_score, mae, rmse, mape };
    match model {
        "gbr" => Some(m(0.9615, 2.11, 2.9, 6.2)),
        "rf" => Some(m(0.9401, 1.94, 3.2, 5.8)),
        "et" => Some(m(0.9463, 1.96, 3.1, 5.9)),
        "xgboost" => Some(m(0.6000, 10.0, 15.0, 25.0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_have_metrics() {
        for model in ["gbr", "rf", "et", "xgboost"] {
            assert!(fallback(model).is_some(), "{model}");
        }
        assert!(fallback("default").is_none());
    }

    #[test]
    fn accuracy_is_r2_as_percent() {
        assert_eq!(fallback("gbr").unwrap().accuracy_percentage(), 96.2);
        assert_eq!(fallback("xgboost").unwrap().accuracy_percentage(), 60.0);
    }
}
