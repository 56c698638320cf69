//! Rate command for recording how well a session went.

use std::io::Write;

use anyhow::{Result, bail};
use sq_core::{SessionId, SleepQuality};
use sq_engine::{Engine, EngineError};

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    id: SessionId,
    quality: SleepQuality,
) -> Result<()> {
    match engine.rate(id, quality).await {
        Ok(Some(_)) => writeln!(writer, "Rated session #{id}: {quality}")?,
        Ok(None) => writeln!(writer, "Session #{id} not found; nothing to rate.")?,
        Err(EngineError::SessionNotStopped { id }) => {
            bail!("session #{id} is still in progress; stop it before rating")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
