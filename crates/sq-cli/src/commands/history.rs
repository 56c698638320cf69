//! History command for listing every session.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use sq_core::{Labels, format_summary};
use sq_engine::Engine;

/// Prints the summary, newest session first, or the raw records as JSON.
pub fn run<W, Tz>(
    writer: &mut W,
    engine: &Engine,
    labels: &Labels,
    tz: &Tz,
    json: bool,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let history = engine.state().history;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &history)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_summary(&history, labels, tz))?;
    }
    Ok(())
}
