//! Regression metrics.

use crate::EvaluateError;

/// Mean absolute error between targets and predictions.
///
/// Returns `None` for empty inputs.
///
/// # Errors
///
/// Returns [`EvaluateError::LengthMismatch`] if the slices differ in length.
pub fn mean_absolute_error(targets: &[f64], predictions: &[f64]) -> Result<Option<f64>, EvaluateError> {
    if targets.len() != predictions.len() {
        return Err(EvaluateError::LengthMismatch {
            features: predictions.len(),
            targets: targets.len(),
        });
    }
    if targets.is_empty() {
        return Ok(None);
    }
    let total: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(target, prediction)| (target - prediction).abs())
        .sum();
    Ok(Some(total / targets.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mae() {
        let mae = mean_absolute_error(&[1.0, 2.0, 4.0], &[2.0, 2.0, 1.0])
            .unwrap()
            .unwrap();
        assert_relative_eq!(mae, 4.0 / 3.0);
        assert_eq!(mean_absolute_error(&[], &[]).unwrap(), None);
        assert!(mean_absolute_error(&[1.0], &[]).is_err());
    }
}
