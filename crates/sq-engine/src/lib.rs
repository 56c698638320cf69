//! Session lifecycle engine for the sleep quality tracker.
//!
//! The [`Engine`] owns the current-session slot and applies commands one at a
//! time on a dedicated task, publishing an [`EngineState`](sq_core::EngineState)
//! snapshot after every change. [`ListFeed`] turns the store's history feed
//! into edit scripts for list rendering.

mod clock;
mod engine;
mod error;
mod list;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use list::{ListFeed, ListRenderer};
