//! Clear command for deleting all recorded sessions.

use std::io::Write;

use anyhow::Result;
use sq_engine::Engine;

pub async fn run<W: Write>(writer: &mut W, engine: &Engine) -> Result<()> {
    let deleted = engine.clear().await?;
    tracing::debug!(deleted, "sessions cleared");

    if engine.state().pending_notice {
        writeln!(
            writer,
            "All your data is gone forever. ({deleted} sessions deleted)"
        )?;
        engine.consume_notice().await?;
    }
    Ok(())
}
