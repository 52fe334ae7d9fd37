//! Supervised datasets built from candle sequences.

use crate::{EvaluateError, OhlcRow};

/// Feature rows paired with the close `forecast_steps` candles ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature rows.
    pub features: Vec<OhlcRow>,
    /// Target prices, one per feature row.
    pub targets: Vec<f64>,
}

impl Dataset {
    /// Builds a dataset by shifting the close column back by `forecast_steps`.
    ///
    /// The last `forecast_steps` rows have no target and are dropped.
    #[must_use]
    pub fn with_target(rows: &[OhlcRow], forecast_steps: usize) -> Self {
        let usable = rows.len().saturating_sub(forecast_steps);
        let features = rows[..usable].to_vec();
        let targets = rows[forecast_steps.min(rows.len())..]
            .iter()
            .map(|row| row.close)
            .collect();
        Self { features, targets }
    }

    /// Returns the number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the dataset has no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Splits rows in time order: the last `test_fraction` of rows form the test set.
///
/// # Errors
///
/// Returns [`EvaluateError::InvalidTestFraction`] unless `0 < test_fraction < 1`.
pub fn chronological_split(
    rows: &[OhlcRow],
    test_fraction: f64,
) -> Result<(&[OhlcRow], &[OhlcRow]), EvaluateError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(EvaluateError::InvalidTestFraction(test_fraction));
    }
    let test_len = (rows.len() as f64 * test_fraction) as usize;
    Ok(rows.split_at(rows.len() - test_len))
}
