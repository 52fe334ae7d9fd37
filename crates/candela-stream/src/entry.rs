//! Topic entries.

use candela_types::Record;
use serde::{Deserialize, Serialize};

/// One line of a topic file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    /// Partitioning key, usually the instrument id.
    pub key: String,
    /// The record.
    pub value: Record,
    /// Wall-clock append time in epoch milliseconds.
    pub timestamp_ms: i64,
}
