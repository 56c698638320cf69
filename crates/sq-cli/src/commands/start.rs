//! Start command for beginning a sleep session.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::TimeZone;
use sq_core::format::format_timestamp;
use sq_engine::{Engine, EngineError};

pub async fn run<W, Tz>(writer: &mut W, engine: &Engine, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let session = match engine.start().await {
        Ok(session) => session,
        Err(EngineError::SessionInProgress { id }) => {
            bail!("session #{id} is already in progress; stop it first with `sq stop`")
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(id = %session.id, "session started");

    writeln!(
        writer,
        "Started session #{} at {}",
        session.id,
        format_timestamp(session.start_time, tz)
    )?;
    Ok(())
}
