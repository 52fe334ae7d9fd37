//! Evaluation errors.

use thiserror::Error;

/// Errors raised while preparing data or evaluating a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluateError {
    /// A stored row lacks a numeric field.
    #[error("Row {row} is missing numeric field '{field}'")]
    MissingField {
        /// Index of the row.
        row: usize,
        /// The missing field.
        field: &'static str,
    },

    /// The test fraction must lie strictly between 0 and 1.
    #[error("Test fraction must be in (0, 1), got {0}")]
    InvalidTestFraction(f64),

    /// Too few rows remain after the split and target shift.
    #[error("Not enough rows for the {split} set: {rows} rows, forecast steps {forecast_steps}")]
    NotEnoughRows {
        /// Which split ran short.
        split: &'static str,
        /// Rows in that split before the shift.
        rows: usize,
        /// The forecast horizon.
        forecast_steps: usize,
    },

    /// Features and targets differ in length.
    #[error("Length mismatch: {features} feature rows, {targets} targets")]
    LengthMismatch {
        /// Number of feature rows.
        features: usize,
        /// Number of targets.
        targets: usize,
    },
}
