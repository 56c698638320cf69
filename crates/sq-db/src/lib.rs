//! Storage layer for the sleep quality tracker.
//!
//! Provides persistence for sleep sessions using `rusqlite`, plus the async
//! [`RecordStore`] contract the session engine is written against.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. [`SqliteStore`] provides
//! that synchronization and moves every statement onto the blocking pool.
//!
//! # Schema
//!
//! A single `sleep_sessions` table keyed by an autoincrementing integer, so
//! IDs are monotonic and never reused even after a bulk delete.
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as INTEGER epoch milliseconds. A session in progress
//! has `end_time_ms = start_time_ms`, which only holds if both values survive
//! storage exactly, hence integers rather than formatted text.
//!
//! ## Quality
//!
//! Stored as an INTEGER score `0..=5`, with `-1` for "not rated yet".

mod store;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sq_core::{NewSession, SessionId, SessionRecord, SleepQuality, ValidationError};
use thiserror::Error;

pub use store::{RecordStore, SqliteStore, StoreError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row does not decode into a valid session.
    #[error("invalid session row {id}: {source}")]
    InvalidRow {
        id: i64,
        #[source]
        source: ValidationError,
    },
    /// A stored timestamp is outside the representable range.
    #[error("invalid timestamp for session {id}: {millis}")]
    InvalidTimestamp { id: i64, millis: i64 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Columns as stored, before validation.
struct SessionRow {
    id: i64,
    start_time_ms: i64,
    end_time_ms: i64,
    quality: i64,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time_ms: row.get(1)?,
            end_time_ms: row.get(2)?,
            quality: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, DbError> {
        let id = SessionId::new(self.id).map_err(|source| DbError::InvalidRow {
            id: self.id,
            source,
        })?;
        let quality =
            SleepQuality::from_stored(self.quality).map_err(|source| DbError::InvalidRow {
                id: self.id,
                source,
            })?;
        Ok(SessionRecord {
            id,
            start_time: parse_millis(self.start_time_ms, self.id)?,
            end_time: parse_millis(self.end_time_ms, self.id)?,
            quality,
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        self.conn.execute_batch(
            "
            -- start_time_ms / end_time_ms: epoch milliseconds, equal while in progress
            -- quality: 0..=5, -1 when unrated
            CREATE TABLE IF NOT EXISTS sleep_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time_ms INTEGER NOT NULL,
                end_time_ms INTEGER NOT NULL,
                quality INTEGER NOT NULL DEFAULT -1
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a session and returns its assigned ID.
    pub fn insert_session(&mut self, session: &NewSession) -> Result<SessionId, DbError> {
        self.conn.execute(
            "INSERT INTO sleep_sessions (start_time_ms, end_time_ms, quality) VALUES (?, ?, ?)",
            params![
                session.start_time.timestamp_millis(),
                session.end_time.timestamp_millis(),
                SleepQuality::to_stored(session.quality),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        SessionId::new(id).map_err(|source| DbError::InvalidRow { id, source })
    }

    /// Overwrites a stored session by ID.
    ///
    /// Returns `false` if no session has that ID.
    pub fn update_session(&mut self, record: &SessionRecord) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE sleep_sessions SET start_time_ms = ?, end_time_ms = ?, quality = ? WHERE id = ?",
            params![
                record.start_time.timestamp_millis(),
                record.end_time.timestamp_millis(),
                SleepQuality::to_stored(record.quality),
                record.id.get(),
            ],
        )?;
        Ok(rows > 0)
    }

    /// Fetches a session by ID.
    pub fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>, DbError> {
        self.conn
            .query_row(
                "
                SELECT id, start_time_ms, end_time_ms, quality
                FROM sleep_sessions
                WHERE id = ?
                ",
                [id.get()],
                SessionRow::from_row,
            )
            .optional()?
            .map(SessionRow::into_record)
            .transpose()
    }

    /// Fetches the most recently created session.
    pub fn most_recent_session(&self) -> Result<Option<SessionRecord>, DbError> {
        self.conn
            .query_row(
                "
                SELECT id, start_time_ms, end_time_ms, quality
                FROM sleep_sessions
                ORDER BY id DESC
                LIMIT 1
                ",
                [],
                SessionRow::from_row,
            )
            .optional()?
            .map(SessionRow::into_record)
            .transpose()
    }

    /// Lists all sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time_ms, end_time_ms, quality
            FROM sleep_sessions
            ORDER BY id DESC
            ",
        )?;
        let rows = stmt.query_map([], SessionRow::from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_record()?);
        }
        Ok(sessions)
    }

    /// Deletes every session and returns how many were removed.
    pub fn delete_all_sessions(&mut self) -> Result<usize, DbError> {
        let deleted = self.conn.execute("DELETE FROM sleep_sessions", [])?;
        Ok(deleted)
    }
}

fn parse_millis(millis: i64, id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(millis).ok_or(DbError::InvalidTimestamp { id, millis })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        let columns = table_columns(&db.conn, "sleep_sessions");
        assert_eq!(
            columns,
            vec!["id", "start_time_ms", "end_time_ms", "quality"]
        );
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut db = Database::open_in_memory().expect("open in-memory db");

        let first = db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap();
        let second = db.insert_session(&NewSession::starting_at(at_millis(2_000))).unwrap();

        assert!(second > first);
    }

    #[test]
    fn unrated_quality_is_stored_as_sentinel() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let id = db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap();

        let stored: i64 = db
            .conn
            .query_row(
                "SELECT quality FROM sleep_sessions WHERE id = ?",
                [id.get()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, -1);

        let record = db.get_session(id).unwrap().unwrap();
        assert_eq!(record.quality, None);
        assert!(record.is_in_progress());
    }

    #[test]
    fn update_session_round_trips_all_fields() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let id = db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap();
        let record = db
            .get_session(id)
            .unwrap()
            .unwrap()
            .stopped_at(at_millis(2_000))
            .rated(SleepQuality::Ok);

        assert!(db.update_session(&record).unwrap());
        assert_eq!(db.get_session(id).unwrap(), Some(record));
    }

    #[test]
    fn update_missing_session_reports_false() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let record = NewSession::starting_at(at_millis(1_000)).with_id(SessionId::new(42).unwrap());

        assert!(!db.update_session(&record).unwrap());
    }

    #[test]
    fn most_recent_and_list_are_newest_first() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(db.most_recent_session().unwrap(), None);

        let a = db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap();
        let b = db.insert_session(&NewSession::starting_at(at_millis(2_000))).unwrap();
        let c = db.insert_session(&NewSession::starting_at(at_millis(3_000))).unwrap();

        assert_eq!(db.most_recent_session().unwrap().unwrap().id, c);
        let ids: Vec<_> = db.list_sessions().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn delete_all_removes_everything_without_reusing_ids() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let a = db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap();
        db.insert_session(&NewSession::starting_at(at_millis(2_000))).unwrap();

        assert_eq!(db.delete_all_sessions().unwrap(), 2);
        assert!(db.list_sessions().unwrap().is_empty());
        assert_eq!(db.get_session(a).unwrap(), None);

        let next = db.insert_session(&NewSession::starting_at(at_millis(3_000))).unwrap();
        assert!(next.get() > 2);
    }

    #[test]
    fn corrupt_quality_is_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO sleep_sessions (start_time_ms, end_time_ms, quality) VALUES (1, 2, 9)",
                [],
            )
            .unwrap();

        let err = db.list_sessions().unwrap_err();
        assert!(matches!(err, DbError::InvalidRow { id: 1, .. }));
    }

    #[test]
    fn open_on_disk_persists_across_connections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sq.db");

        let id = {
            let mut db = Database::open(&path).unwrap();
            db.insert_session(&NewSession::starting_at(at_millis(1_000))).unwrap()
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(db.most_recent_session().unwrap().unwrap().id, id);
    }
}
