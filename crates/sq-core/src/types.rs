//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The quality score is outside the rated range and is not the unset sentinel.
    #[error("sleep quality must be between 0 and 5, got {value}")]
    QualityOutOfRange { value: i64 },

    /// A session identifier was not positive.
    #[error("session ID must be positive, got {value}")]
    InvalidSessionId { value: i64 },

    /// Invalid quality name.
    #[error("invalid sleep quality: {value}")]
    InvalidQualityName { value: String },
}

/// Store-assigned identifier of a sleep session.
///
/// IDs are handed out by the store in increasing order and never reused, so a
/// larger ID always means a more recently created session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SessionId(i64);

impl SessionId {
    /// Creates a new ID after validation.
    pub const fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::InvalidSessionId { value: id });
        }
        Ok(Self(id))
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for SessionId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim_start_matches('#')
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidSessionId { value: 0 })?;
        Self::new(value)
    }
}

/// Self-rated quality of a finished session.
///
/// This enum encodes the valid scores, preventing out-of-range integers from
/// reaching the store. An unrated session is represented as `None` at the
/// record level and persisted as [`SleepQuality::UNSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    /// Integer persisted for sessions that have not been rated yet.
    pub const UNSET: i64 = -1;

    /// Every score, worst first.
    pub const ALL: [Self; 6] = [
        Self::VeryBad,
        Self::Poor,
        Self::SoSo,
        Self::Ok,
        Self::PrettyGood,
        Self::Excellent,
    ];

    /// Converts a numeric score (`0..=5`) into a quality.
    pub const fn from_score(score: i64) -> Result<Self, ValidationError> {
        match score {
            0 => Ok(Self::VeryBad),
            1 => Ok(Self::Poor),
            2 => Ok(Self::SoSo),
            3 => Ok(Self::Ok),
            4 => Ok(Self::PrettyGood),
            5 => Ok(Self::Excellent),
            value => Err(ValidationError::QualityOutOfRange { value }),
        }
    }

    /// Decodes a stored integer, mapping the unset sentinel to `None`.
    pub fn from_stored(value: i64) -> Result<Option<Self>, ValidationError> {
        if value == Self::UNSET {
            return Ok(None);
        }
        Self::from_score(value).map(Some)
    }

    /// Encodes an optional quality for storage.
    #[must_use]
    pub const fn to_stored(quality: Option<Self>) -> i64 {
        match quality {
            Some(quality) => quality.score(),
            None => Self::UNSET,
        }
    }

    /// Numeric score in `0..=5`.
    #[must_use]
    pub const fn score(self) -> i64 {
        self as i64
    }

    /// Machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VeryBad => "very_bad",
            Self::Poor => "poor",
            Self::SoSo => "so_so",
            Self::Ok => "ok",
            Self::PrettyGood => "pretty_good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SleepQuality {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(score) = s.parse::<i64>() {
            return Self::from_score(score);
        }
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidQualityName {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_non_positive() {
        assert_eq!(
            SessionId::new(0),
            Err(ValidationError::InvalidSessionId { value: 0 })
        );
        assert!(SessionId::new(-3).is_err());
        assert_eq!(SessionId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn session_id_parses_with_optional_hash() {
        assert_eq!("#12".parse::<SessionId>().unwrap().get(), 12);
        assert_eq!("12".parse::<SessionId>().unwrap().get(), 12);
        assert!("abc".parse::<SessionId>().is_err());
    }

    #[test]
    fn session_id_deserialize_rejects_zero() {
        let result: Result<SessionId, _> = serde_json::from_str("0");
        assert!(result.is_err());
    }

    #[test]
    fn quality_score_range() {
        for (score, quality) in (0..).zip(SleepQuality::ALL) {
            assert_eq!(SleepQuality::from_score(score), Ok(quality));
            assert_eq!(quality.score(), score);
        }
        assert_eq!(
            SleepQuality::from_score(6),
            Err(ValidationError::QualityOutOfRange { value: 6 })
        );
        assert!(SleepQuality::from_score(-1).is_err());
    }

    #[test]
    fn quality_stored_sentinel() {
        assert_eq!(SleepQuality::from_stored(-1), Ok(None));
        assert_eq!(SleepQuality::from_stored(4), Ok(Some(SleepQuality::PrettyGood)));
        assert!(SleepQuality::from_stored(-2).is_err());
        assert_eq!(SleepQuality::to_stored(None), -1);
        assert_eq!(SleepQuality::to_stored(Some(SleepQuality::Excellent)), 5);
    }

    #[test]
    fn quality_parses_names_and_scores() {
        assert_eq!("3".parse::<SleepQuality>(), Ok(SleepQuality::Ok));
        assert_eq!("so_so".parse::<SleepQuality>(), Ok(SleepQuality::SoSo));
        assert!("great".parse::<SleepQuality>().is_err());
    }
}
