//! Core types for the candela trade-to-candle pipeline.
//!
//! This crate provides the fundamental data structures shared by every stage:
//!
//! - [`Trade`] - A validated trade event carrying its own event time
//! - [`RawTrade`] - Unvalidated trade fields as they arrive on the wire
//! - [`WindowDuration`] - Tumbling window length used for candle aggregation
//! - [`TimeRange`] - Half-open event-time range for historical replays
//! - [`Record`] - JSON-compatible key/value row handed to sinks and topics
//! - [`RetryPolicy`] - Exponential backoff budget for retries and reconnects

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod record;
mod retry;
mod time_range;
mod timestamp;
mod trade;
mod window;

pub use error::{CandelaError, DataShapeError, Result, TimeRangeError, WindowError};
pub use record::{Record, field_as_key, to_record};
pub use retry::RetryPolicy;
pub use time_range::TimeRange;
pub use timestamp::{datetime_from_ms, iso8601_to_ms};
pub use trade::{RawTrade, Trade};
pub use window::{WindowBounds, WindowDuration};
