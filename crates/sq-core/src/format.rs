//! Human-readable rendering of session history.

use std::fmt::Display;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;
use crate::types::SleepQuality;

/// Timestamp layout used in summaries, e.g. `Wednesday Jan-01-2025 22:00`.
const TIMESTAMP_FORMAT: &str = "%A %b-%d-%Y %H:%M";

/// Text resources for the summary.
///
/// Deserializable so a config file can swap in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub title: String,
    pub start: String,
    pub end: String,
    pub quality: String,
    pub elapsed: String,
    pub in_progress: String,
    pub unrated: String,
    /// Quality names indexed by score, worst first.
    pub qualities: [String; 6],
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            title: "Here is your sleep data".to_string(),
            start: "Start".to_string(),
            end: "End".to_string(),
            quality: "Quality".to_string(),
            elapsed: "Hours:Minutes:Seconds".to_string(),
            in_progress: "in progress".to_string(),
            unrated: "--".to_string(),
            qualities: [
                "Very bad".to_string(),
                "Poor".to_string(),
                "So-so".to_string(),
                "OK".to_string(),
                "Pretty good".to_string(),
                "Excellent".to_string(),
            ],
        }
    }
}

impl Labels {
    /// Display name for a rating, or the unrated marker.
    #[must_use]
    pub fn quality_label(&self, quality: Option<SleepQuality>) -> &str {
        match quality {
            Some(quality) => self
                .qualities
                .get(usize::try_from(quality.score()).unwrap_or_default())
                .map_or(self.unrated.as_str(), String::as_str),
            None => &self.unrated,
        }
    }
}

/// Formats a duration as `H:MM:SS`. Negative durations render as zero.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Formats a timestamp in the given zone using the summary layout.
pub fn format_timestamp<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string()
}

/// Builds the multi-line summary of `records`, in the order given.
///
/// Each session is a block of start, end, quality and elapsed lines separated
/// by a blank line. Sessions still in progress show the in-progress label
/// instead of an end time and have no elapsed line.
pub fn format_summary<Tz>(records: &[SessionRecord], labels: &Labels, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    out.push_str(&labels.title);
    out.push('\n');

    for record in records {
        out.push('\n');
        push_line(&mut out, &labels.start, &format_timestamp(record.start_time, tz));
        if record.is_in_progress() {
            push_line(&mut out, &labels.end, &labels.in_progress);
            push_line(&mut out, &labels.quality, labels.quality_label(record.quality));
        } else {
            push_line(&mut out, &labels.end, &format_timestamp(record.end_time, tz));
            push_line(&mut out, &labels.quality, labels.quality_label(record.quality));
            push_line(&mut out, &labels.elapsed, &format_elapsed(record.elapsed()));
        }
    }

    out
}

/// Appends `label: value` and a newline.
fn push_line(out: &mut String, label: &str, value: &str) {
    out.push_str(label);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}
