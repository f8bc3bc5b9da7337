// Copyright (c) 2025 - Cowboy AI, Inc.
//! Discriminator
//!
//! Evaluates a query "as of" an instant. Timestamps are compared at
//! millisecond resolution because several storage engines keep no more.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temporal predicate: an instant and a same-millisecond tie-break rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discriminator {
    instant: DateTime<Utc>,
    prefer_existence: bool,
}

impl Discriminator {
    /// As of `instant`, preferring existence on same-millisecond ties
    pub fn time(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            prefer_existence: true,
        }
    }

    /// As of the wall-clock present
    pub fn now() -> Self {
        Self::time(Utc::now())
    }

    /// Same instant, but a delete in the instant's millisecond excludes the
    /// element
    pub fn exclude_deleted_in_millisecond(&self) -> Self {
        Self {
            instant: self.instant,
            prefer_existence: false,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn prefer_existence(&self) -> bool {
        self.prefer_existence
    }

    /// Instant truncated to milliseconds since the epoch
    pub fn millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_exclude_deleted_returns_new_value() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let d = Discriminator::time(at);
        let strict = d.exclude_deleted_in_millisecond();

        assert!(d.prefer_existence());
        assert!(!strict.prefer_existence());
        assert_eq!(strict.instant(), at);
        assert!(!strict.exclude_deleted_in_millisecond().prefer_existence());
    }
}
