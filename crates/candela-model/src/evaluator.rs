//! Model capability and the baseline model.

use crate::{EvaluateError, OhlcRow};

/// A model that can be fitted on candles and predict a future price.
pub trait Evaluator {
    /// Returns a short model name for reports.
    fn name(&self) -> &str;

    /// Fits the model on feature rows and their targets.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs are inconsistent.
    fn fit(&mut self, features: &[OhlcRow], targets: &[f64]) -> Result<(), EvaluateError>;

    /// Predicts one target per feature row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot predict for these rows.
    fn predict(&self, features: &[OhlcRow]) -> Result<Vec<f64>, EvaluateError>;
}

/// Predicts that the future price equals the current close.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentPriceBaseline;

impl Evaluator for CurrentPriceBaseline {
    fn name(&self) -> &str {
        "current_price_baseline"
    }

    fn fit(&mut self, features: &[OhlcRow], targets: &[f64]) -> Result<(), EvaluateError> {
        if features.len() == targets.len() {
            Ok(())
        } else {
            Err(EvaluateError::LengthMismatch {
                features: features.len(),
                targets: targets.len(),
            })
        }
    }

    fn predict(&self, features: &[OhlcRow]) -> Result<Vec<f64>, EvaluateError> {
        Ok(features.iter().map(|row| row.close).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_predicts_close() {
        let row = OhlcRow {
            timestamp_ms: 60_000,
            open: 1.0,
            high: 3.0,
            low: 0.5,
            close: 2.0,
            volume: 4.0,
        };
        let mut model = CurrentPriceBaseline;
        model.fit(&[row.clone()], &[2.5]).unwrap();
        assert_eq!(model.predict(&[row.clone()]).unwrap(), vec![2.0]);
        assert!(model.fit(&[row], &[]).is_err());
    }
}
