//! Watch command for following the session list as it changes.
//!
//! Other `sq` processes write through their own database connections, so the
//! store is re-read on a fixed interval and every difference is printed as an
//! edit script.

use std::fmt::Display;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use chrono::TimeZone;
use sq_core::{Labels, ListChange};
use sq_db::RecordStore;
use sq_engine::{ListFeed, ListRenderer};
use tokio::time::MissedTickBehavior;

use super::util::session_line;

/// Prints one line per list change.
struct TextRenderer<'a, W, Tz> {
    writer: &'a mut W,
    labels: &'a Labels,
    tz: &'a Tz,
    error: Option<io::Error>,
}

impl<W, Tz> TextRenderer<'_, W, Tz>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fn write_change(&mut self, change: &ListChange) -> io::Result<()> {
        match change {
            ListChange::Insert { index, record } => writeln!(
                self.writer,
                "+ [{index}] {}",
                session_line(record, self.labels, self.tz)
            ),
            ListChange::Update { index, record } => writeln!(
                self.writer,
                "* [{index}] {}",
                session_line(record, self.labels, self.tz)
            ),
            ListChange::Remove { index, id } => writeln!(self.writer, "- [{index}] #{id}"),
            ListChange::Move { from, to, id } => {
                writeln!(self.writer, "~ [{from} -> {to}] #{id}")
            }
        }
    }

    fn take_error(&mut self) -> io::Result<()> {
        self.error.take().map_or(Ok(()), Err)
    }
}

impl<W, Tz> ListRenderer for TextRenderer<'_, W, Tz>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fn apply(&mut self, changes: &[ListChange]) {
        if self.error.is_some() {
            return;
        }
        for change in changes {
            if let Err(e) = self.write_change(change) {
                self.error = Some(e);
                return;
            }
        }
        if let Err(e) = self.writer.flush() {
            self.error = Some(e);
        }
    }
}

/// Prints the current list, then every change, until `count` scripts have
/// been printed (forever when `None`).
pub async fn run<W, Tz, S>(
    writer: &mut W,
    store: &S,
    labels: &Labels,
    tz: &Tz,
    interval: Duration,
    count: Option<usize>,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
    S: RecordStore,
{
    let mut feed = ListFeed::from_store(store);
    let mut renderer = TextRenderer {
        writer,
        labels,
        tz,
        error: None,
    };
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut printed = 0;

    while count.is_none_or(|count| printed < count) {
        tokio::select! {
            changes = feed.next_changes() => {
                let Some(changes) = changes else { break };
                renderer.apply(&changes);
                renderer.take_error()?;
                printed += 1;
            }
            _ = ticker.tick() => {
                match store.refresh().await {
                    Ok(changed) => tracing::trace!(changed, "refreshed session list"),
                    Err(e) => tracing::warn!(error = %e, "failed to refresh session list"),
                }
            }
        }
    }
    Ok(())
}
