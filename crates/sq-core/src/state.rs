//! Observable engine state, derived from its authoritative inputs.

use chrono::Utc;
use serde::Serialize;

use crate::format::{Labels, format_summary};
use crate::session::SessionRecord;

/// A one-shot signal waiting to be acknowledged by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", content = "session", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Nothing to act on.
    #[default]
    None,
    /// A session was stopped and can now be rated.
    Navigate(SessionRecord),
    /// All sessions were cleared.
    Notice,
}

impl EngineEvent {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Snapshot published to subscribers after every state change.
///
/// Every field besides the inputs is computed by [`EngineState::derive`];
/// nothing sets them directly, so they cannot drift from their sources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EngineState {
    pub current_session: Option<SessionRecord>,
    /// All sessions, newest first.
    pub history: Vec<SessionRecord>,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub clear_enabled: bool,
    pub summary_text: String,
    pub pending_navigation: Option<SessionRecord>,
    pub pending_notice: bool,
}

impl EngineState {
    /// Projects the inputs into a full snapshot.
    #[must_use]
    pub fn derive(
        current_session: Option<SessionRecord>,
        history: Vec<SessionRecord>,
        pending_navigation: Option<SessionRecord>,
        pending_notice: bool,
        labels: &Labels,
    ) -> Self {
        let summary_text = format_summary(&history, labels, &Utc);
        Self {
            start_enabled: current_session.is_none(),
            stop_enabled: current_session.is_some(),
            clear_enabled: !history.is_empty(),
            summary_text,
            current_session,
            history,
            pending_navigation,
            pending_notice,
        }
    }

    /// The signal a subscriber should handle next.
    ///
    /// Navigation takes precedence; once it is acknowledged a pending notice
    /// surfaces.
    #[must_use]
    pub fn pending_event(&self) -> EngineEvent {
        if let Some(session) = &self.pending_navigation {
            EngineEvent::Navigate(session.clone())
        } else if self.pending_notice {
            EngineEvent::Notice
        } else {
            EngineEvent::None
        }
    }
}
