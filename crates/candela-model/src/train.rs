//! Train/test evaluation of a model over a candle history.

use serde::Serialize;
use tracing::{debug, info};

use crate::{Dataset, EvaluateError, Evaluator, OhlcRow, chronological_split, mean_absolute_error};

/// Evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// How many candles ahead the target close lies.
    pub forecast_steps: usize,
    /// Share of the most recent rows held out for testing.
    pub test_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            forecast_steps: 1,
            test_fraction: 0.3,
        }
    }
}

impl TrainConfig {
    /// Sets the forecast horizon.
    #[must_use]
    pub const fn with_forecast_steps(mut self, forecast_steps: usize) -> Self {
        self.forecast_steps = forecast_steps;
        self
    }

    /// Sets the test fraction.
    #[must_use]
    pub const fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }
}

/// Result of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Model name.
    pub model: String,
    /// Candles read.
    pub rows: usize,
    /// Training examples after the target shift.
    pub train_rows: usize,
    /// Test examples after the target shift.
    pub test_rows: usize,
    /// Mean absolute error on the test set.
    pub mae: f64,
}

/// Fits `model` on the older rows and scores it on the most recent ones.
///
/// Rows are split chronologically first; each split then gets its target
/// column by shifting the close back `forecast_steps` candles.
///
/// # Errors
///
/// Returns an error if the test fraction is invalid, either split is empty
/// after the shift, or the model fails.
pub fn evaluate(
    model: &mut dyn Evaluator,
    rows: &[OhlcRow],
    config: &TrainConfig,
) -> Result<EvaluationReport, EvaluateError> {
    let (train, test) = chronological_split(rows, config.test_fraction)?;
    let train_set = non_empty("train", train, config.forecast_steps)?;
    let test_set = non_empty("test", test, config.forecast_steps)?;
    debug!(
        train_rows = train_set.len(),
        test_rows = test_set.len(),
        "dataset prepared"
    );

    model.fit(&train_set.features, &train_set.targets)?;
    let predictions = model.predict(&test_set.features)?;
    let mae = mean_absolute_error(&test_set.targets, &predictions)?.unwrap_or_default();

    info!(model = model.name(), mae, "model evaluated");
    Ok(EvaluationReport {
        model: model.name().to_string(),
        rows: rows.len(),
        train_rows: train_set.len(),
        test_rows: test_set.len(),
        mae,
    })
}

fn non_empty(
    split: &'static str,
    rows: &[OhlcRow],
    forecast_steps: usize,
) -> Result<Dataset, EvaluateError> {
    let dataset = Dataset::with_target(rows, forecast_steps);
    if dataset.is_empty() {
        return Err(EvaluateError::NotEnoughRows {
            split,
            rows: rows.len(),
            forecast_steps,
        });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CurrentPriceBaseline;
    use approx::assert_relative_eq;

    fn rows(closes: &[f64]) -> Vec<OhlcRow> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcRow {
                timestamp_ms: (i as i64 + 1) * 60_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_baseline_mae() {
        // 10 rows: train 7, test 3 ([8, 9, 12]); shifted by one the test set
        // predicts 8 -> 9 and 9 -> 12.
        let data = rows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 12.0]);
        let report = evaluate(&mut CurrentPriceBaseline, &data, &TrainConfig::default()).unwrap();
        assert_eq!(report.model, "current_price_baseline");
        assert_eq!(report.rows, 10);
        assert_eq!(report.train_rows, 6);
        assert_eq!(report.test_rows, 2);
        assert_relative_eq!(report.mae, 2.0);
    }

    #[test]
    fn test_not_enough_rows() {
        let data = rows(&[1.0, 2.0, 3.0, 4.0]);
        let config = TrainConfig::default().with_forecast_steps(2);
        let err = evaluate(&mut CurrentPriceBaseline, &data, &config).unwrap_err();
        assert!(matches!(err, EvaluateError::NotEnoughRows { split: "test", .. }));
    }
}
