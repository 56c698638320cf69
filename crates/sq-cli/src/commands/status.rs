//! Status command for showing what is being tracked right now.

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::TimeZone;
use sq_core::format::format_timestamp;
use sq_engine::Engine;

pub fn run<W, Tz>(writer: &mut W, engine: &Engine, database_path: &Path, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let state = engine.state();

    writeln!(writer, "Sleep tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    match state.current_session.as_ref().filter(|s| s.is_in_progress()) {
        Some(session) => writeln!(
            writer,
            "Tracking: session #{} since {}",
            session.id,
            format_timestamp(session.start_time, tz)
        )?,
        None => writeln!(writer, "Tracking: nothing")?,
    }

    let rated = state.history.iter().filter(|s| s.quality.is_some()).count();
    writeln!(writer, "Sessions: {} ({rated} rated)", state.history.len())?;

    let available: Vec<&str> = [
        (state.start_enabled, "start"),
        (state.stop_enabled, "stop"),
        (state.clear_enabled, "clear"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    writeln!(writer, "Available: {}", available.join(", "))?;

    Ok(())
}
