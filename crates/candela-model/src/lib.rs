//! Price prediction baselines for candela candles.
//!
//! - [`OhlcRow`] - One candle read back from the feature store
//! - [`Evaluator`] - `fit` / `predict` capability of a model
//! - [`CurrentPriceBaseline`] - Predicts the current close
//! - [`evaluate`] - Chronological split, target shift and MAE

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dataset;
mod error;
mod evaluator;
mod metrics;
mod row;
mod train;

pub use dataset::{Dataset, chronological_split};
pub use error::EvaluateError;
pub use evaluator::{CurrentPriceBaseline, Evaluator};
pub use metrics::mean_absolute_error;
pub use row::{OhlcRow, rows_from_records};
pub use train::{EvaluationReport, TrainConfig, evaluate};
