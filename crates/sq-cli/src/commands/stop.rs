//! Stop command for ending the session in progress.

use std::io::Write;

use anyhow::Result;
use sq_core::{EngineEvent, SleepQuality, format_elapsed};
use sq_engine::Engine;

/// Stops the current session and hands the navigation event to the rating
/// step: either the quality given on the command line or a hint.
pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    quality: Option<SleepQuality>,
) -> Result<()> {
    let Some(stopped) = engine.stop().await? else {
        writeln!(writer, "No session in progress.")?;
        return Ok(());
    };

    writeln!(
        writer,
        "Stopped session #{} after {}",
        stopped.id,
        format_elapsed(stopped.elapsed())
    )?;

    let event = engine.pending_event();
    let EngineEvent::Navigate(session) = &event else {
        tracing::warn!(?event, "stop did not raise a navigation event");
        return Ok(());
    };

    match quality {
        Some(quality) => {
            if engine.rate(session.id, quality).await?.is_some() {
                writeln!(writer, "Rated session #{}: {quality}", session.id)?;
            }
        }
        None => writeln!(writer, "Rate it with: sq rate {} <0-5>", session.id)?,
    }
    engine.acknowledge(&event).await?;
    Ok(())
}
