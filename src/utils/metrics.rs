use crate::models::Prediction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressionMetric {
    #[default]
    Rmse,
    Mse,
    Mae,
    R2,
}

impl RegressionMetric {
    pub fn name(&self) -> &'static str {
        match self {
            RegressionMetric::Rmse => "rmse",
            RegressionMetric::Mse => "mse",
            RegressionMetric::Mae => "mae",
            RegressionMetric::R2 => "r2",
        }
    }

    /// Whether a smaller value means a better model.
    pub fn is_smaller_better(&self) -> bool {
        !matches!(self, RegressionMetric::R2)
    }
}

/// Scores predictions against their labels. Rows without a prediction are
/// skipped before any metric is computed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEvaluator {
    metric: RegressionMetric,
}

impl RegressionEvaluator {
    pub fn new(metric: RegressionMetric) -> Self {
        Self { metric }
    }

    pub fn rmse() -> Self {
        Self::new(RegressionMetric::Rmse)
    }

    pub fn metric(&self) -> RegressionMetric {
        self.metric
    }

    /// Returns `None` when no row carries a prediction.
    pub fn evaluate(&self, predictions: &[Prediction]) -> Option<f64> {
        let pairs: Vec<(f64, f64)> = defined_pairs(predictions).collect();
        if pairs.is_empty() {
            return None;
        }
        let n = pairs.len() as f64;

        let value = match self.metric {
            RegressionMetric::Rmse => (squared_error_sum(&pairs) / n).sqrt(),
            RegressionMetric::Mse => squared_error_sum(&pairs) / n,
            RegressionMetric::Mae => pairs.iter().map(|(l, p)| (l - p).abs()).sum::<f64>() / n,
            RegressionMetric::R2 => {
                let label_mean = pairs.iter().map(|(l, _)| l).sum::<f64>() / n;
                let total: f64 = pairs.iter().map(|(l, _)| (l - label_mean).powi(2)).sum();
                let residual = squared_error_sum(&pairs);
                if total == 0.0 {
                    // Constant labels: perfect fit or nothing to explain.
                    if residual == 0.0 { 1.0 } else { 0.0 }
                } else {
                    1.0 - residual / total
                }
            }
        };

        Some(value)
    }
}

fn defined_pairs(predictions: &[Prediction]) -> impl Iterator<Item = (f64, f64)> + '_ {
    predictions
        .iter()
        .filter_map(|p| p.prediction.map(|value| (p.rating as f64, value as f64)))
}

fn squared_error_sum(pairs: &[(f64, f64)]) -> f64 {
    pairs.iter().map(|(l, p)| (l - p).powi(2)).sum()
}

/// Number of rows that have no prediction.
pub fn count_undefined(predictions: &[Prediction]) -> usize {
    predictions.iter().filter(|p| !p.is_defined()).count()
}

pub fn rmse(predictions: &[Prediction]) -> Option<f64> {
    RegressionEvaluator::rmse().evaluate(predictions)
}
