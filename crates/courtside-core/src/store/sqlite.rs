// Embedded SQLite match collection.
//
// Timestamps are stored the way the hosted store represents them (seconds
// plus nanoseconds) so both backends share one decode path. Writes made
// through the admin methods wake every subscriber, which then re-reads the
// whole collection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use super::{MatchStore, Subscription, SnapshotCallback};
use crate::error::Result;
use crate::model::{decode_snapshot, Match, MatchRecord};

/// Capacity of the change-notification channel. Notifications carry no
/// payload, so a lagging subscriber only needs one re-read to catch up.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// SQLite-backed match collection. Cloning shares the same connection.
#[derive(Clone)]
pub struct SqliteMatchStore {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<()>,
}

impl SqliteMatchStore {
    /// Open (or create) the collection at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS matches (
                id           TEXT PRIMARY KEY,
                player1      TEXT,
                player2      TEXT,
                score        TEXT,
                date_seconds INTEGER,
                date_nanos   INTEGER NOT NULL DEFAULT 0,
                tournament   TEXT,
                status       TEXT,
                court        TEXT,
                updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date_seconds);
            ",
        )?;

        info!("Match store opened at {path}");

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                changes,
            }),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.inner
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        // No receivers simply means nobody is subscribed.
        let _ = self.inner.changes.send(());
    }

    /// Read and decode the whole collection, newest first. Rows that fail
    /// to decode are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<Match>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, player1, player2, score, date_seconds, date_nanos, tournament, status, court
             FROM matches
             ORDER BY date_seconds DESC, date_nanos DESC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let seconds: Option<i64> = row.get(4)?;
                let nanos: i64 = row.get(5)?;
                Ok(MatchRecord {
                    id: row.get(0)?,
                    player1: row.get(1)?,
                    player2: row.get(2)?,
                    score: row.get(3)?,
                    date: seconds.map(|seconds| crate::model::StoreTimestamp {
                        seconds,
                        nanoseconds: u32::try_from(nanos).unwrap_or(u32::MAX),
                    }),
                    tournament: row.get(6)?,
                    status: row.get(7)?,
                    court: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(decode_snapshot(records))
    }

    /// Insert a raw record as-is. Admin tooling and tests use this to store
    /// documents that may be incomplete.
    pub fn insert_record(&self, record: &MatchRecord) -> Result<()> {
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO matches
                    (id, player1, player2, score, date_seconds, date_nanos, tournament, status, court)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.player1,
                    record.player2,
                    record.score,
                    record.date.map(|d| d.seconds),
                    record.date.map_or(0, |d| d.nanoseconds),
                    record.tournament,
                    record.status,
                    record.court,
                ],
            )?;
        }
        self.notify();
        Ok(())
    }

    pub fn insert_match(&self, m: &Match) -> Result<()> {
        self.insert_record(&MatchRecord::from_match(m))
    }

    /// Replace every field of an existing match. Returns `false` when no
    /// match with that id exists.
    pub fn update_match(&self, m: &Match) -> Result<bool> {
        let record = MatchRecord::from_match(m);
        let changed = {
            let conn = self.conn();
            conn.execute(
                "UPDATE matches SET
                    player1 = ?2, player2 = ?3, score = ?4, date_seconds = ?5, date_nanos = ?6,
                    tournament = ?7, status = ?8, court = ?9,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    record.id,
                    record.player1,
                    record.player2,
                    record.score,
                    record.date.map(|d| d.seconds),
                    record.date.map_or(0, |d| d.nanoseconds),
                    record.tournament,
                    record.status,
                    record.court,
                ],
            )?
        };
        if changed > 0 {
            self.notify();
        }
        Ok(changed > 0)
    }

    /// Delete a match by id. Returns `false` when nothing was deleted.
    pub fn delete_match(&self, id: &str) -> Result<bool> {
        let changed = {
            let conn = self.conn();
            conn.execute("DELETE FROM matches WHERE id = ?1", params![id])?
        };
        if changed > 0 {
            self.notify();
        }
        Ok(changed > 0)
    }

    /// Insert `matches` only when the collection is empty. Returns how many
    /// were inserted.
    pub fn seed_if_empty(&self, matches: &[Match]) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        if count > 0 {
            debug!("Match store already holds {count} matches, not seeding");
            return Ok(0);
        }
        for m in matches {
            self.insert_match(m)?;
        }
        info!("Seeded match store with {} matches", matches.len());
        Ok(matches.len())
    }
}

#[async_trait]
impl MatchStore for SqliteMatchStore {
    async fn fetch_all(&self) -> Result<Vec<Match>> {
        self.read_all()
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        // Subscribe to changes before the first read so nothing written in
        // between is missed.
        let mut changes = self.inner.changes.subscribe();
        let store = self.clone();

        Subscription::spawn(callback, move |mut delivery| async move {
            if !delivery.deliver(store.read_all()) {
                return;
            }
            loop {
                match changes.recv().await {
                    Ok(()) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Match subscriber lagged by {skipped} notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
                if !delivery.deliver(store.read_all()) {
                    break;
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
