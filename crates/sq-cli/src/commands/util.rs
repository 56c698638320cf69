//! Shared rendering helpers for CLI commands.

use std::fmt::Display;

use chrono::TimeZone;
use sq_core::format::format_timestamp;
use sq_core::{Labels, SessionRecord, format_elapsed};

/// One-line description of a session, as used by `watch` and `status`.
///
/// `#3  Wednesday Jan-01-2025 22:00  8:30:05  Pretty good`
pub fn session_line<Tz>(record: &SessionRecord, labels: &Labels, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let start = format_timestamp(record.start_time, tz);
    if record.is_in_progress() {
        format!("#{}  {start}  {}", record.id, labels.in_progress)
    } else {
        format!(
            "#{}  {start}  {}  {}",
            record.id,
            format_elapsed(record.elapsed()),
            labels.quality_label(record.quality)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use sq_core::{SessionId, SleepQuality};

    #[test]
    fn session_line_for_finished_and_running_sessions() {
        let finished = SessionRecord {
            id: SessionId::new(3).unwrap(),
            start_time: "2025-01-01T22:00:00Z".parse().unwrap(),
            end_time: "2025-01-02T06:30:05Z".parse().unwrap(),
            quality: Some(SleepQuality::PrettyGood),
        };
        let running = SessionRecord {
            end_time: finished.start_time,
            quality: None,
            ..finished.clone()
        };
        let labels = Labels::default();

        assert_eq!(
            session_line(&finished, &labels, &Utc),
            "#3  Wednesday Jan-01-2025 22:00  8:30:05  Pretty good"
        );
        assert_eq!(
            session_line(&running, &labels, &Utc),
            "#3  Wednesday Jan-01-2025 22:00  in progress"
        );
    }
}
