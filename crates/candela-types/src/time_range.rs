//! Event-time ranges for historical replay.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{TimeRangeError, datetime_from_ms};

/// A half-open `[start_ms, end_ms)` event-time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    /// Start in epoch milliseconds (inclusive).
    pub start_ms: i64,
    /// End in epoch milliseconds (exclusive).
    pub end_ms: i64,
}

impl TimeRange {
    /// Creates a new time range, validating that start < end.
    ///
    /// # Errors
    ///
    /// Returns an error if `start_ms >= end_ms`.
    pub const fn new(start_ms: i64, end_ms: i64) -> Result<Self, TimeRangeError> {
        if start_ms >= end_ms {
            return Err(TimeRangeError::InvalidRange { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Creates the range covering the last `days` days up to `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if `days` is zero.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if days == 0 {
            return Err(TimeRangeError::EmptyLookback);
        }
        let end_ms = now.timestamp_millis();
        let start_ms = (now - TimeDelta::days(i64::from(days))).timestamp_millis();
        Self::new(start_ms.max(0), end_ms)
    }

    /// Returns true if the range contains the given event time.
    #[must_use]
    pub const fn contains(&self, event_time_ms: i64) -> bool {
        event_time_ms >= self.start_ms && event_time_ms < self.end_ms
    }

    /// Returns the range length in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Returns the fraction of the range covered up to `event_time_ms`, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress(&self, event_time_ms: i64) -> f64 {
        let done = (event_time_ms - self.start_ms).clamp(0, self.duration_ms());
        done as f64 / self.duration_ms() as f64
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (datetime_from_ms(self.start_ms), datetime_from_ms(self.end_ms)) {
            (Some(start), Some(end)) => write!(
                f,
                "{} to {}",
                start.format("%Y-%m-%dT%H:%M:%SZ"),
                end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
            _ => write!(f, "{}ms to {}ms", self.start_ms, self.end_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_range_new() {
        let range = TimeRange::new(0, 10).unwrap();
        assert!(range.contains(0));
        assert!(range.contains(9));
        assert!(!range.contains(10));
        assert_eq!(range.duration_ms(), 10);
    }

    #[test]
    fn test_time_range_invalid() {
        assert_eq!(
            TimeRange::new(10, 10),
            Err(TimeRangeError::InvalidRange { start_ms: 10, end_ms: 10 })
        );
    }

    #[test]
    fn test_last_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let range = TimeRange::last_days(7, now).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(range.start_ms, start.timestamp_millis());
        assert_eq!(range.end_ms, now.timestamp_millis());
        assert_eq!(range.to_string(), "2024-01-01T00:00:00Z to 2024-01-08T00:00:00Z");
    }

    #[test]
    fn test_last_days_zero() {
        assert_eq!(
            TimeRange::last_days(0, Utc::now()),
            Err(TimeRangeError::EmptyLookback)
        );
    }

    #[test]
    fn test_progress() {
        let range = TimeRange::new(100, 200).unwrap();
        assert!((range.progress(150) - 0.5).abs() < 1e-10);
        assert!((range.progress(50) - 0.0).abs() < 1e-10);
        assert!((range.progress(500) - 1.0).abs() < 1e-10);
    }
}
