//! Sleep sessions - one start-to-stop tracking interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SessionId, SleepQuality};

/// A stored sleep session.
///
/// A session is in progress while `end_time == start_time`; there is no
/// separate flag. Stopping moves `end_time` forward, after which only the
/// quality may change, and only once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Identifier assigned by the store.
    pub id: SessionId,
    /// When tracking started.
    pub start_time: DateTime<Utc>,
    /// When tracking stopped, or `start_time` while still tracking.
    pub end_time: DateTime<Utc>,
    /// Self-rated quality, `None` until rated.
    pub quality: Option<SleepQuality>,
}

impl SessionRecord {
    /// Whether the session is still being tracked.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.end_time == self.start_time
    }

    /// Time between start and end. Zero while in progress.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Returns a copy stopped at `now`.
    ///
    /// The end time is forced at least one millisecond past the start so a
    /// stopped session can never be mistaken for one in progress.
    #[must_use]
    pub fn stopped_at(&self, now: DateTime<Utc>) -> Self {
        let now = truncate_to_millis(now);
        let end_time = if now > self.start_time {
            now
        } else {
            self.start_time + Duration::milliseconds(1)
        };
        Self {
            end_time,
            ..self.clone()
        }
    }

    /// Returns a copy carrying the given rating.
    #[must_use]
    pub fn rated(&self, quality: SleepQuality) -> Self {
        Self {
            quality: Some(quality),
            ..self.clone()
        }
    }
}

/// A session that has not been stored yet, so has no ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub quality: Option<SleepQuality>,
}

impl NewSession {
    /// Creates an in-progress, unrated session starting at `now`.
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let start_time = truncate_to_millis(now);
        Self {
            start_time,
            end_time: start_time,
            quality: None,
        }
    }

    /// Attaches the store-assigned ID.
    #[must_use]
    pub fn with_id(self, id: SessionId) -> SessionRecord {
        SessionRecord {
            id,
            start_time: self.start_time,
            end_time: self.end_time,
            quality: self.quality,
        }
    }
}

/// Drops sub-millisecond precision so timestamps survive storage as epoch
/// milliseconds unchanged.
#[must_use]
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or(timestamp)
}
