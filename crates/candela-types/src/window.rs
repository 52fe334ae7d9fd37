//! Tumbling window definitions.

use std::num::NonZeroU64;
use std::str::FromStr;

use crate::WindowError;

/// Length of a tumbling event-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowDuration(NonZeroU64);

impl WindowDuration {
    /// One minute, the default candle length.
    pub const ONE_MINUTE: Self = match NonZeroU64::new(60_000) {
        Some(ms) => Self(ms),
        None => unreachable!(),
    };

    /// Creates a window duration from milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Zero`] if `ms` is zero.
    pub const fn from_millis(ms: u64) -> Result<Self, WindowError> {
        match NonZeroU64::new(ms) {
            Some(ms) => Ok(Self(ms)),
            None => Err(WindowError::Zero),
        }
    }

    /// Creates a window duration from whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Zero`] if `secs` is zero.
    pub const fn from_secs(secs: u64) -> Result<Self, WindowError> {
        Self::from_millis(secs.saturating_mul(1000))
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0.get()
    }

    /// Returns the duration in milliseconds as a signed value for event-time math.
    #[must_use]
    pub const fn as_millis_i64(&self) -> i64 {
        if self.0.get() > i64::MAX as u64 {
            i64::MAX
        } else {
            self.0.get() as i64
        }
    }

    /// Returns the start of the window containing `event_time_ms`.
    ///
    /// A timestamp exactly on a boundary belongs to the window starting there.
    #[must_use]
    pub const fn window_start(&self, event_time_ms: i64) -> i64 {
        let len = self.as_millis_i64();
        event_time_ms.div_euclid(len) * len
    }

    /// Returns the `[start, end)` bounds of the window containing `event_time_ms`.
    #[must_use]
    pub const fn bounds(&self, event_time_ms: i64) -> WindowBounds {
        let start_ms = self.window_start(event_time_ms);
        WindowBounds {
            start_ms,
            end_ms: start_ms.saturating_add(self.as_millis_i64()),
        }
    }
}

impl std::fmt::Display for WindowDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ms = self.as_millis();
        match ms {
            ms if ms % 86_400_000 == 0 => write!(f, "{}d", ms / 86_400_000),
            ms if ms % 3_600_000 == 0 => write!(f, "{}h", ms / 3_600_000),
            ms if ms % 60_000 == 0 => write!(f, "{}m", ms / 60_000),
            ms if ms % 1000 == 0 => write!(f, "{}s", ms / 1000),
            ms => write!(f, "{ms}ms"),
        }
    }
}

impl FromStr for WindowDuration {
    type Err = WindowError;

    /// Parses `10` (seconds), `500ms`, `10s`, `1m`, `1h` or `1d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(lower.len());
        let (digits, unit) = lower.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| WindowError::Parse(s.to_string()))?;

        let multiplier = match unit {
            "ms" => 1,
            "" | "s" | "sec" | "secs" => 1000,
            "m" | "min" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(WindowError::Parse(s.to_string())),
        };

        Self::from_millis(value.saturating_mul(multiplier))
    }
}

/// Half-open `[start_ms, end_ms)` bounds of one tumbling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowBounds {
    /// Inclusive window start in epoch milliseconds.
    pub start_ms: i64,
    /// Exclusive window end in epoch milliseconds.
    pub end_ms: i64,
}

impl WindowBounds {
    /// Returns true if the event time falls inside the window.
    #[must_use]
    pub const fn contains(&self, event_time_ms: i64) -> bool {
        event_time_ms >= self.start_ms && event_time_ms < self.end_ms
    }
}
