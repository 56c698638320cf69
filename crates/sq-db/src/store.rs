//! Async record store contract and its SQLite implementation.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sq_core::{NewSession, SessionId, SessionRecord};
use thiserror::Error;
use tokio::sync::watch;

use crate::{Database, DbError};

/// Errors surfaced by a [`RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected the operation.
    #[error(transparent)]
    Db(#[from] DbError),
    /// An update targeted a session that does not exist.
    #[error("session {0} not found")]
    NotFound(SessionId),
    /// The blocking task running the statement panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The backend cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable, ordered storage for sleep sessions.
///
/// Every operation is async and must not block the caller. Implementations
/// keep the [`subscribe_all`](RecordStore::subscribe_all) feed current: after
/// any successful mutation the feed holds every session, newest first.
pub trait RecordStore: Send + Sync + 'static {
    /// Stores a new session and returns its assigned ID.
    fn insert(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<SessionId, StoreError>> + Send;

    /// Overwrites an existing session, failing with [`StoreError::NotFound`]
    /// if the ID is absent.
    fn update(&self, record: SessionRecord)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_by_id(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// The session with the highest ID, if any.
    fn get_most_recent(
        &self,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Removes every session and returns how many were removed.
    fn delete_all(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Re-reads the full table and publishes it if it differs from the feed.
    ///
    /// Picks up writes made through another connection. Returns whether the
    /// feed changed.
    fn refresh(&self) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Subscribes to all sessions, newest first.
    fn subscribe_all(&self) -> watch::Receiver<Vec<SessionRecord>>;
}

/// [`RecordStore`] backed by a [`Database`].
///
/// Statements run on tokio's blocking pool behind a mutex. The feed is
/// republished while the mutex is still held, so concurrent writers can never
/// publish their snapshots out of order.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
    feed: Arc<watch::Sender<Vec<SessionRecord>>>,
}

impl SqliteStore {
    /// Wraps an open database, seeding the feed with its current contents.
    pub fn new(db: Database) -> Result<Self, StoreError> {
        let sessions = db.list_sessions()?;
        let (feed, _) = watch::channel(sessions);
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            feed: Arc::new(feed),
        })
    }

    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::new(Database::open(path)?)
    }

    /// Opens an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Database::open_in_memory()?)
    }

    /// Runs a read on the blocking pool.
    async fn read<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Database) -> Result<R, DbError> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || {
            let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await?;
        Ok(result?)
    }

    /// Runs a write on the blocking pool, then republishes the feed.
    ///
    /// Once `f` succeeds the write is committed, so a failure to re-list the
    /// table only leaves the feed stale until the next write or refresh.
    async fn write<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Database) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let feed = Arc::clone(&self.feed);
        tokio::task::spawn_blocking(move || -> Result<R, StoreError> {
            let mut guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            let result = f(&mut guard)?;
            match guard.list_sessions() {
                Ok(sessions) => {
                    publish(&feed, sessions);
                }
                Err(err) => tracing::warn!(error = %err, "failed to republish sessions"),
            }
            Ok(result)
        })
        .await?
    }
}

/// Replaces the feed contents, notifying only when they changed.
fn publish(feed: &watch::Sender<Vec<SessionRecord>>, sessions: Vec<SessionRecord>) -> bool {
    feed.send_if_modified(|current| {
        if *current == sessions {
            false
        } else {
            *current = sessions;
            true
        }
    })
}

impl RecordStore for SqliteStore {
    async fn insert(&self, session: NewSession) -> Result<SessionId, StoreError> {
        let id = self
            .write(move |db| Ok(db.insert_session(&session)?))
            .await?;
        tracing::debug!(%id, "inserted session");
        Ok(id)
    }

    async fn update(&self, record: SessionRecord) -> Result<(), StoreError> {
        let id = record.id;
        self.write(move |db| {
            if db.update_session(&record)? {
                Ok(())
            } else {
                Err(StoreError::NotFound(record.id))
            }
        })
        .await?;
        tracing::debug!(%id, "updated session");
        Ok(())
    }

    async fn get_by_id(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.read(move |db| db.get_session(id)).await
    }

    async fn get_most_recent(&self) -> Result<Option<SessionRecord>, StoreError> {
        self.read(Database::most_recent_session).await
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let deleted = self
            .write(|db| Ok(db.delete_all_sessions()?))
            .await?;
        tracing::debug!(deleted, "deleted all sessions");
        Ok(deleted)
    }

    async fn refresh(&self) -> Result<bool, StoreError> {
        let db = Arc::clone(&self.db);
        let feed = Arc::clone(&self.feed);
        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            let sessions = guard.list_sessions()?;
            Ok(publish(&feed, sessions))
        })
        .await?
    }

    fn subscribe_all(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use sq_core::SleepQuality;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let store = SqliteStore::open_in_memory().unwrap();

        let id = store.insert(NewSession::starting_at(at_millis(1_000))).await.unwrap();

        let most_recent = store.get_most_recent().await.unwrap().unwrap();
        assert_eq!(most_recent.id, id);
        assert!(most_recent.is_in_progress());
        assert_eq!(store.get_by_id(id).await.unwrap(), Some(most_recent));
    }

    #[tokio::test]
    async fn update_missing_session_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = SessionId::new(9).unwrap();
        let record = NewSession::starting_at(at_millis(1_000)).with_id(id);

        let err = store.update(record).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn feed_tracks_every_mutation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut feed = store.subscribe_all();
        assert!(feed.borrow_and_update().is_empty());

        let a = store.insert(NewSession::starting_at(at_millis(1_000))).await.unwrap();
        let b = store.insert(NewSession::starting_at(at_millis(2_000))).await.unwrap();
        assert!(feed.has_changed().unwrap());
        let ids: Vec<_> = feed.borrow_and_update().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a]);

        let rated = store
            .get_by_id(a)
            .await
            .unwrap()
            .unwrap()
            .stopped_at(at_millis(1_500))
            .rated(SleepQuality::Poor);
        store.update(rated.clone()).await.unwrap();
        assert_eq!(feed.borrow_and_update()[1], rated);

        store.delete_all().await.unwrap();
        assert!(feed.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn refresh_picks_up_writes_from_other_connections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sq.db");
        let watcher = SqliteStore::open(&path).unwrap();
        let writer = SqliteStore::open(&path).unwrap();
        let mut feed = watcher.subscribe_all();

        assert!(!watcher.refresh().await.unwrap());

        let id = writer.insert(NewSession::starting_at(at_millis(1_000))).await.unwrap();
        assert!(!feed.has_changed().unwrap());

        assert!(watcher.refresh().await.unwrap());
        assert_eq!(feed.borrow_and_update()[0].id, id);
        assert!(!watcher.refresh().await.unwrap());
    }

    #[tokio::test]
    async fn committed_write_succeeds_when_feed_cannot_be_rebuilt() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert(NewSession::starting_at(at_millis(1_000))).await.unwrap();
        let mut feed = store.subscribe_all();
        feed.borrow_and_update();

        // A row that no longer validates makes every full listing fail.
        store
            .db
            .lock()
            .unwrap()
            .conn
            .execute("UPDATE sleep_sessions SET quality = 9", [])
            .unwrap();

        let second = store.insert(NewSession::starting_at(at_millis(2_000))).await.unwrap();

        assert_ne!(first, second);
        assert!(store.get_by_id(second).await.unwrap().is_some());
        assert!(!feed.has_changed().unwrap());
        assert!(store.refresh().await.is_err());
    }
}
