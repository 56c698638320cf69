//! Core domain logic for the sleep quality tracker.
//!
//! This crate contains the fundamental types and pure logic for:
//! - Sessions: the stored record and its in-progress sentinel
//! - State: the observable snapshot derived from engine inputs
//! - Projection: edit scripts for diffed list rendering
//! - Formatting: the human-readable history summary

pub mod format;
pub mod projection;
pub mod session;
pub mod state;
mod types;

pub use format::{Labels, format_elapsed, format_summary};
pub use projection::{ListChange, ListProjection};
pub use session::{NewSession, SessionRecord};
pub use state::{EngineEvent, EngineState};
pub use types::{SessionId, SleepQuality, ValidationError};
