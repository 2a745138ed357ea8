// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-machine backend: ownership row in a shared SQLite database
//!
//! Acquisition serializes through the engine's write lock (`BEGIN
//! IMMEDIATE`, bounded by the busy timeout) just long enough to upsert the
//! ownership row. Durable ownership is the row's content: the holder's
//! listener re-reads it on a fixed interval and treats any other owner (or a
//! missing row) as displacement. There is no push channel across machines,
//! so handoff latency is bounded by the polling interval.

use async_trait::async_trait;
use chrono::Utc;
use maindom_core::{BackendError, DomainKey, LockBackend};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS main_dom_lock (
    key TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// SQLite backend configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SqliteLockConfig {
    /// Shared database file; all contending instances must point at the
    /// same one
    pub db_path: PathBuf,
    /// How often the holder re-validates the ownership row
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Busy timeout for the best-effort row cleanup on dispose
    #[serde(with = "humantime_serde")]
    pub dispose_busy_timeout: Duration,
}

impl SqliteLockConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            poll_interval: Duration::from_secs(1),
            dispose_busy_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_dispose_busy_timeout(mut self, timeout: Duration) -> Self {
        self.dispose_busy_timeout = timeout;
        self
    }
}

/// Mutual exclusion between instances sharing one database, scoped by
/// `DomainKey`.
pub struct SqliteRowLock {
    key: DomainKey,
    owner_id: String,
    config: SqliteLockConfig,
}

/// Outcome of one listener poll tick.
enum PollTick {
    Owner(Option<String>),
    Busy,
}

impl SqliteRowLock {
    pub fn new(key: DomainKey, config: SqliteLockConfig) -> Self {
        Self {
            key,
            owner_id: Uuid::new_v4().to_string(),
            config,
        }
    }

    /// The opaque identifier this instance writes into the ownership row.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

#[async_trait]
impl LockBackend for SqliteRowLock {
    async fn acquire(&self, timeout: Duration) -> Result<bool, BackendError> {
        let db_path = self.config.db_path.clone();
        let row_key = self.key.as_str().to_string();
        let owner = self.owner_id.clone();

        let acquired =
            tokio::task::spawn_blocking(move || acquire_blocking(&db_path, &row_key, &owner, timeout))
                .await
                .map_err(BackendError::store)??;

        if acquired {
            debug!(key = %self.key, owner = %self.owner_id, "ownership row written");
        } else {
            debug!(key = %self.key, ?timeout, "database write lock wait timed out");
        }
        Ok(acquired)
    }

    async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), BackendError> {
        loop {
            // `changed()` alone misses a flag set before this receiver was
            // subscribed; check the current value each pass
            if *shutdown.borrow() {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => return Ok(()),
            }

            let db_path = self.config.db_path.clone();
            let row_key = self.key.as_str().to_string();
            let tick = tokio::task::spawn_blocking(move || read_owner_blocking(&db_path, &row_key))
                .await
                .map_err(BackendError::store)??;

            match tick {
                PollTick::Owner(Some(owner)) if owner == self.owner_id => continue,
                PollTick::Owner(Some(owner)) => {
                    info!(key = %self.key, new_owner = %owner, "displaced by another instance");
                    return Ok(());
                }
                PollTick::Owner(None) => {
                    warn!(key = %self.key, "ownership row missing, stepping down");
                    return Ok(());
                }
                PollTick::Busy => {
                    // A writer held the lock through our read; re-check next tick
                    debug!(key = %self.key, "ownership poll skipped, database busy");
                }
            }
        }
    }

    async fn dispose(&self) -> Result<(), BackendError> {
        let db_path = self.config.db_path.clone();
        let row_key = self.key.as_str().to_string();
        let owner = self.owner_id.clone();
        let busy_timeout = self.config.dispose_busy_timeout;
        let key = self.key.clone();

        // Best effort: a row left behind is harmless, a newer owner's row is
        // never touched (the delete is owner-qualified)
        let result = tokio::task::spawn_blocking(move || {
            release_blocking(&db_path, &row_key, &owner, busy_timeout)
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(key = %key, error = %e, "ownership row cleanup skipped"),
            Err(e) => debug!(key = %key, error = %e, "ownership row cleanup task failed"),
        }
        Ok(())
    }
}

fn open_connection(db_path: &Path, busy_timeout: Duration) -> Result<Connection, BackendError> {
    let conn = Connection::open(db_path).map_err(BackendError::store)?;
    conn.busy_timeout(busy_timeout)
        .map_err(BackendError::store)?;
    Ok(conn)
}

fn acquire_blocking(
    db_path: &Path,
    row_key: &str,
    owner: &str,
    timeout: Duration,
) -> Result<bool, BackendError> {
    let mut conn = open_connection(db_path, timeout)?;

    if let Err(e) = conn.execute_batch(CREATE_TABLE_SQL) {
        if is_busy(&e) {
            return Ok(false);
        }
        return Err(BackendError::store(e));
    }

    // BEGIN IMMEDIATE takes the engine write lock up front, bounded by the
    // busy timeout; a busy/locked error is the classified timed-out outcome
    let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
        Ok(tx) => tx,
        Err(e) if is_busy(&e) => return Ok(false),
        Err(e) => return Err(BackendError::store(e)),
    };

    tx.execute(
        "INSERT INTO main_dom_lock (key, owner, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET owner = excluded.owner, updated_at = excluded.updated_at",
        params![row_key, owner, Utc::now().to_rfc3339()],
    )
    .map_err(BackendError::store)?;

    // Commit releases the write lock; ownership is now the row's content
    match tx.commit() {
        Ok(()) => Ok(true),
        Err(e) if is_busy(&e) => Ok(false),
        Err(e) => Err(BackendError::store(e)),
    }
}

fn read_owner_blocking(db_path: &Path, row_key: &str) -> Result<PollTick, BackendError> {
    let mut conn = open_connection(db_path, Duration::from_millis(0))?;

    if let Err(e) = conn.execute_batch(CREATE_TABLE_SQL) {
        if is_busy(&e) {
            return Ok(PollTick::Busy);
        }
        return Err(BackendError::store(e));
    }

    // Deferred transaction: the SELECT runs under a shared read lock, which
    // coexists with other readers and only delays a concurrent writer
    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) if is_busy(&e) => return Ok(PollTick::Busy),
        Err(e) => return Err(BackendError::store(e)),
    };

    let owner = match tx
        .query_row(
            "SELECT owner FROM main_dom_lock WHERE key = ?1",
            params![row_key],
            |row| row.get::<_, String>(0),
        )
        .optional()
    {
        Ok(owner) => owner,
        Err(e) if is_busy(&e) => return Ok(PollTick::Busy),
        Err(e) => return Err(BackendError::store(e)),
    };

    tx.commit().map_err(BackendError::store)?;
    Ok(PollTick::Owner(owner))
}

fn release_blocking(
    db_path: &Path,
    row_key: &str,
    owner: &str,
    busy_timeout: Duration,
) -> Result<(), BackendError> {
    let conn = open_connection(db_path, busy_timeout)?;
    conn.execute(
        "DELETE FROM main_dom_lock WHERE key = ?1 AND owner = ?2",
        params![row_key, owner],
    )
    .map_err(BackendError::store)?;
    Ok(())
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
