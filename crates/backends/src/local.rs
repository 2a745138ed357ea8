// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-machine backend: exclusive file lock plus a signal file
//!
//! The mutual-exclusion token is an exclusive `fs2` lock on
//! `<directory>/<key>.lock`. The signal channel is `<directory>/<key>.signal`:
//! non-empty content means "someone wants the lease", empty means quiet.
//! Contenders write a nonce to wake the current holder, and reset the file
//! to empty once their acquisition attempt is over, win or lose.

use async_trait::async_trait;
use fs2::FileExt;
use maindom_core::{BackendError, DomainKey, LockBackend};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Local backend configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalLockConfig {
    /// Directory holding the lock and signal files. Must be shared by all
    /// local processes contending for the same key.
    pub directory: PathBuf,
    /// How often the holder checks the signal file
    #[serde(with = "humantime_serde")]
    pub signal_poll_interval: Duration,
    /// How often a contender retries the file lock while acquiring
    #[serde(with = "humantime_serde")]
    pub lock_poll_interval: Duration,
}

impl LocalLockConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            signal_poll_interval: Duration::from_millis(100),
            lock_poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_signal_poll_interval(mut self, interval: Duration) -> Self {
        self.signal_poll_interval = interval;
        self
    }

    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }
}

/// Mutual exclusion between processes on one machine, scoped by `DomainKey`.
pub struct LocalFileLock {
    key: DomainKey,
    config: LocalLockConfig,
    lock_path: PathBuf,
    signal_path: PathBuf,
    held: Mutex<Option<File>>,
}

impl LocalFileLock {
    pub fn new(key: DomainKey, config: LocalLockConfig) -> Self {
        let lock_path = config.directory.join(format!("{}.lock", key));
        let signal_path = config.directory.join(format!("{}.signal", key));
        Self {
            key,
            config,
            lock_path,
            signal_path,
            held: Mutex::new(None),
        }
    }

    /// Try the exclusive lock once without blocking.
    fn try_lock(&self) -> Result<bool, BackendError> {
        let mut held = self.lock_held();
        if held.is_some() {
            return Ok(true);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                *held = Some(file);
                Ok(true)
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the signal file atomically (write-then-rename), so the
    /// holder's poll never reads a partial write.
    fn write_signal(&self, content: &str) -> Result<(), BackendError> {
        fs::create_dir_all(&self.config.directory)?;
        let tmp = self
            .config
            .directory
            .join(format!("{}.signal.{}", self.key, Uuid::new_v4().simple()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.signal_path)?;
        Ok(())
    }

    fn signal_raised(&self) -> Result<bool, BackendError> {
        match fs::read(&self.signal_path) {
            Ok(bytes) => Ok(!bytes.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn lock_held(&self) -> std::sync::MutexGuard<'_, Option<File>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LockBackend for LocalFileLock {
    async fn acquire(&self, timeout: Duration) -> Result<bool, BackendError> {
        // Wake the current holder, then contend for the lock
        let nonce = Uuid::new_v4().to_string();
        self.write_signal(&nonce)?;
        debug!(key = %self.key, "wake signal raised, contending for lock file");

        let deadline = Instant::now() + timeout;
        let acquired = loop {
            if self.try_lock()? {
                break true;
            }
            let now = Instant::now();
            if now >= deadline {
                break false;
            }
            let wait = self.config.lock_poll_interval.min(deadline - now);
            tokio::time::sleep(wait).await;
        };

        // Reset the signal whether we won or lost. Skipping this on success
        // would make our own listener fire on our own wake-up, and the new
        // holder would immediately release again.
        self.write_signal("")?;

        if acquired {
            debug!(key = %self.key, "lock file acquired");
        } else {
            debug!(key = %self.key, ?timeout, "lock file still held elsewhere, giving up");
        }
        Ok(acquired)
    }

    async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), BackendError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            if self.signal_raised()? {
                debug!(key = %self.key, "wake signal observed");
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.signal_poll_interval) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn dispose(&self) -> Result<(), BackendError> {
        let mut held = self.lock_held();
        if let Some(file) = held.take() {
            // Unlock but never unlink: removing the path while a contender
            // holds an open handle to the old inode would let two locks
            // coexist on one path.
            FileExt::unlock(&file)?;
            debug!(key = %self.key, "lock file released");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
