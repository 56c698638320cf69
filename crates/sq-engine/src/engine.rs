//! The session engine: one task owning the current-session slot.
//!
//! Commands are sent over an MPSC channel to a single worker task, which
//! applies them in arrival order. Each command awaits at most its own store
//! calls, so a later command never observes a half-applied earlier one. After
//! every command the worker derives a fresh [`EngineState`] and publishes it
//! on a watch channel before replying to the caller.

use std::sync::Arc;

use sq_core::{
    EngineEvent, EngineState, Labels, NewSession, SessionId, SessionRecord, SleepQuality,
};
use sq_db::{RecordStore, StoreError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::EngineError;

/// Default depth of the command queue.
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many commands may wait behind the one being applied.
    pub queue_capacity: usize,
    /// Labels for the derived summary text.
    pub labels: Labels,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            labels: Labels::default(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Request sent to the worker.
enum Command {
    Start(Reply<SessionRecord>),
    Stop(Reply<Option<SessionRecord>>),
    Rate {
        id: SessionId,
        quality: SleepQuality,
        reply: Reply<Option<SessionRecord>>,
    },
    Clear(Reply<usize>),
    ConsumeNavigation(Reply<()>),
    ConsumeNotice(Reply<()>),
    Acknowledge {
        event: EngineEvent,
        reply: Reply<bool>,
    },
    /// Replies once every earlier command has been applied.
    Flush(Reply<()>),
}

/// Handle to a running session engine.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) aborts the
/// worker. A store call still in flight at that point is abandoned: its
/// result is discarded and its caller receives [`EngineError::Closed`].
pub struct Engine {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<EngineState>,
    worker: JoinHandle<()>,
}

impl Engine {
    /// Spawns the worker task on the current tokio runtime.
    ///
    /// The worker first loads the most recent stored session and adopts it
    /// as the current session if it is still in progress, so tracking
    /// survives a restart. Commands sent meanwhile queue behind that load.
    pub fn spawn<S: RecordStore>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let feed = store.subscribe_all();
        let initial = EngineState::derive(None, feed.borrow().clone(), None, false, &config.labels);
        let (state_tx, state) = watch::channel(initial);

        let worker = Worker {
            store,
            clock,
            labels: config.labels,
            feed,
            state: state_tx,
            current: None,
            history: Vec::new(),
            pending_navigation: None,
            pending_notice: false,
        };
        let worker = tokio::spawn(worker.run(rx));

        Self { tx, state, worker }
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.clone()
    }

    /// The latest published snapshot.
    pub fn state(&self) -> EngineState {
        self.state.borrow().clone()
    }

    /// The one-shot signal waiting to be handled, if any.
    pub fn pending_event(&self) -> EngineEvent {
        self.state.borrow().pending_event()
    }

    /// Waits until every command sent so far, including the initial load,
    /// has been applied.
    pub async fn ready(&self) -> Result<(), EngineError> {
        self.request(Command::Flush).await
    }

    /// Starts tracking a new session.
    ///
    /// Rejected with [`EngineError::SessionInProgress`] while another session
    /// is being tracked.
    pub async fn start(&self) -> Result<SessionRecord, EngineError> {
        self.request(Command::Start).await
    }

    /// Stops the session in progress and raises the navigation signal.
    ///
    /// Returns `Ok(None)` without touching anything when no session is in
    /// progress.
    pub async fn stop(&self) -> Result<Option<SessionRecord>, EngineError> {
        self.request(Command::Stop).await
    }

    /// Rates a stopped session.
    ///
    /// Returns `Ok(None)` when the session no longer exists, which happens
    /// when it was cleared in the meantime.
    pub async fn rate(
        &self,
        id: SessionId,
        quality: SleepQuality,
    ) -> Result<Option<SessionRecord>, EngineError> {
        self.request(|reply| Command::Rate { id, quality, reply })
            .await
    }

    /// Deletes every session, empties the current slot and raises the
    /// notice signal. Returns how many sessions were deleted.
    pub async fn clear(&self) -> Result<usize, EngineError> {
        self.request(Command::Clear).await
    }

    /// Resets the navigation signal.
    pub async fn consume_navigation(&self) -> Result<(), EngineError> {
        self.request(Command::ConsumeNavigation).await
    }

    /// Resets the notice signal.
    pub async fn consume_notice(&self) -> Result<(), EngineError> {
        self.request(Command::ConsumeNotice).await
    }

    /// Resets the signal `event` was read from.
    ///
    /// A navigation event only resets the signal if it still points at the
    /// same session, so acknowledging a stale event cannot swallow a newer
    /// one. Returns whether a signal was reset.
    pub async fn acknowledge(&self, event: &EngineEvent) -> Result<bool, EngineError> {
        let event = event.clone();
        self.request(|reply| Command::Acknowledge { event, reply })
            .await
    }

    /// Aborts the worker. Later commands fail with [`EngineError::Closed`].
    pub fn shutdown(&self) {
        self.worker.abort();
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        reply_rx.await.map_err(|_| EngineError::Closed)?
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// State owned by the worker task.
struct Worker<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    labels: Labels,
    feed: watch::Receiver<Vec<SessionRecord>>,
    state: watch::Sender<EngineState>,
    current: Option<SessionRecord>,
    history: Vec<SessionRecord>,
    pending_navigation: Option<SessionRecord>,
    pending_notice: bool,
}

impl<S: RecordStore> Worker<S> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        self.initialize().await;

        let mut feed_open = true;
        loop {
            tokio::select! {
                command = rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle(command).await;
                }
                changed = self.feed.changed(), if feed_open => {
                    if changed.is_err() {
                        tracing::warn!("record store feed closed");
                        feed_open = false;
                        continue;
                    }
                    self.sync_history();
                    self.publish();
                }
            }
        }
        tracing::debug!("engine worker stopped");
    }

    async fn initialize(&mut self) {
        match self.store.get_most_recent().await {
            Ok(record) => {
                self.current = record.filter(SessionRecord::is_in_progress);
                if let Some(current) = &self.current {
                    tracing::debug!(id = %current.id, "resumed session in progress");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load most recent session");
            }
        }
        self.sync_history();
        self.publish();
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = self.start().await;
                self.finish(reply, result);
            }
            Command::Stop(reply) => {
                let result = self.stop().await;
                self.finish(reply, result);
            }
            Command::Rate { id, quality, reply } => {
                let result = self.rate(id, quality).await;
                self.finish(reply, result);
            }
            Command::Clear(reply) => {
                let result = self.clear().await;
                self.finish(reply, result);
            }
            Command::ConsumeNavigation(reply) => {
                self.pending_navigation = None;
                self.finish(reply, Ok(()));
            }
            Command::ConsumeNotice(reply) => {
                self.pending_notice = false;
                self.finish(reply, Ok(()));
            }
            Command::Acknowledge { event, reply } => {
                let reset = self.acknowledge(&event);
                self.finish(reply, Ok(reset));
            }
            Command::Flush(reply) => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    /// Publishes the post-command state, then replies.
    fn finish<T>(&mut self, reply: Reply<T>, result: Result<T, EngineError>) {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "command failed");
        }
        self.sync_history();
        self.publish();
        let _ = reply.send(result);
    }

    async fn start(&mut self) -> Result<SessionRecord, EngineError> {
        if let Some(current) = self.current.as_ref().filter(|s| s.is_in_progress()) {
            return Err(EngineError::SessionInProgress { id: current.id });
        }
        // The feed can lag behind other connections and the initial load may
        // have failed, so the store has the final say.
        if let Some(running) = self
            .store
            .get_most_recent()
            .await?
            .filter(SessionRecord::is_in_progress)
        {
            tracing::debug!(id = %running.id, "adopted session in progress from store");
            let id = running.id;
            self.current = Some(running);
            return Err(EngineError::SessionInProgress { id });
        }

        let session = NewSession::starting_at(self.clock.now());
        let id = self.store.insert(session.clone()).await?;
        let record = match self.store.get_most_recent().await {
            Ok(Some(record)) if record.id == id => record,
            Ok(other) => {
                self.current = other.filter(SessionRecord::is_in_progress);
                return Err(StoreError::NotFound(id).into());
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "failed to re-read new session");
                session.with_id(id)
            }
        };

        tracing::debug!(id = %record.id, "started session");
        self.current = Some(record.clone());
        Ok(record)
    }

    async fn stop(&mut self) -> Result<Option<SessionRecord>, EngineError> {
        let Some(current) = self.current.as_ref().filter(|s| s.is_in_progress()) else {
            tracing::debug!("stop ignored: no session in progress");
            return Ok(None);
        };

        let stopped = current.stopped_at(self.clock.now());
        self.store.update(stopped.clone()).await?;

        tracing::debug!(id = %stopped.id, "stopped session");
        self.current = Some(stopped.clone());
        self.pending_navigation = Some(stopped.clone());
        Ok(Some(stopped))
    }

    async fn rate(
        &mut self,
        id: SessionId,
        quality: SleepQuality,
    ) -> Result<Option<SessionRecord>, EngineError> {
        let Some(record) = self.store.get_by_id(id).await? else {
            tracing::debug!(%id, "rating abandoned: session not found");
            return Ok(None);
        };
        if record.is_in_progress() {
            return Err(EngineError::SessionNotStopped { id });
        }

        let rated = record.rated(quality);
        match self.store.update(rated.clone()).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(%id, "rating abandoned: session deleted");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }

        tracing::debug!(%id, %quality, "rated session");
        if self.current.as_ref().is_some_and(|current| current.id == id) {
            self.current = Some(rated.clone());
        }
        Ok(Some(rated))
    }

    async fn clear(&mut self) -> Result<usize, EngineError> {
        let deleted = self.store.delete_all().await?;

        tracing::debug!(deleted, "cleared sessions");
        self.current = None;
        self.pending_notice = true;
        Ok(deleted)
    }

    fn acknowledge(&mut self, event: &EngineEvent) -> bool {
        match event {
            EngineEvent::Navigate(session) => {
                let matches = self
                    .pending_navigation
                    .as_ref()
                    .is_some_and(|pending| pending.id == session.id);
                if matches {
                    self.pending_navigation = None;
                }
                matches
            }
            EngineEvent::Notice => std::mem::take(&mut self.pending_notice),
            EngineEvent::None => false,
        }
    }

    /// Takes the latest store contents. A session in progress that arrived
    /// through the feed becomes the current session, so it is the one `stop`
    /// acts on and `start` refuses to run beside.
    fn sync_history(&mut self) {
        self.history = self.feed.borrow_and_update().clone();
        if self.current.as_ref().is_some_and(SessionRecord::is_in_progress) {
            return;
        }
        if let Some(running) = self.history.iter().find(|r| r.is_in_progress()) {
            tracing::debug!(id = %running.id, "adopted session in progress from feed");
            self.current = Some(running.clone());
        }
    }

    fn publish(&self) {
        let next = EngineState::derive(
            self.current.clone(),
            self.history.clone(),
            self.pending_navigation.clone(),
            self.pending_notice,
            &self.labels,
        );
        self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}
