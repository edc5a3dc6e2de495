//! Durable run history — who ran, when, and how it went.
//!
//! A single JSON array file shared by every Jazz process on the machine.
//! Mutations are bracketed by a directory lock (atomic mkdir) with stale-lock
//! reclamation, and persisted via temp-file write + atomic rename so a crash
//! mid-write never corrupts the log.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use jazz_core::config::JazzPaths;
use jazz_core::error::{JazzError, Result};

/// History array is trimmed to this many records, oldest dropped first.
pub const HISTORY_RETENTION: usize = 200;

/// A lock directory untouched for this long is presumed abandoned.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
/// Sleep between lock attempts.
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Give up after this many attempts.
const LOCK_MAX_ATTEMPTS: u32 = 50;

/// One historical execution attempt of a groove.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub groove_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub triggered_by: TriggeredBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredBy {
    Manual,
    Scheduled,
}

/// Patch applied to the latest running record of a groove.
#[derive(Debug, Clone)]
pub struct RunUpdate {
    pub status: RunStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunUpdate {
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Completed,
            completed_at: Some(at),
            error: None,
        }
    }

    pub fn failed(at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            completed_at: Some(at),
            error: Some(error.into()),
        }
    }
}

/// The run history store.
#[derive(Debug, Clone)]
pub struct RunHistory {
    file: PathBuf,
    lock_dir: PathBuf,
    retention: usize,
}

impl RunHistory {
    pub fn new(paths: &JazzPaths) -> Self {
        Self {
            file: paths.history_file.clone(),
            lock_dir: paths.history_lock_dir.clone(),
            retention: HISTORY_RETENTION,
        }
    }

    /// Override the retention cap (tests).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Read the full history. Missing file or structurally bad content reads
    /// as empty; any other IO failure propagates.
    pub async fn load(&self) -> Result<Vec<RunRecord>> {
        let bytes = match fs::read(&self.file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    /// Append a record, trimming the oldest entries past the retention cap.
    pub async fn append(&self, record: RunRecord) -> Result<()> {
        self.acquire_lock().await?;
        let result = self.append_locked(record).await;
        self.release_lock().await;
        result
    }

    async fn append_locked(&self, record: RunRecord) -> Result<()> {
        let mut records = self.load().await?;
        records.push(record);
        if records.len() > self.retention {
            let excess = records.len() - self.retention;
            records.drain(..excess);
        }
        self.persist(&records).await
    }

    /// Merge `update` into the most recent running record for `groove_name`.
    /// No matching record is a silent no-op; a record is never fabricated.
    pub async fn patch_latest_running(&self, groove_name: &str, update: RunUpdate) -> Result<()> {
        self.acquire_lock().await?;
        let result = self.patch_locked(groove_name, update).await;
        self.release_lock().await;
        result
    }

    async fn patch_locked(&self, groove_name: &str, update: RunUpdate) -> Result<()> {
        let mut records = self.load().await?;
        let target = records
            .iter_mut()
            .rev()
            .find(|r| r.groove_name == groove_name && r.status == RunStatus::Running);
        let Some(record) = target else {
            return Ok(());
        };
        record.status = update.status;
        if update.completed_at.is_some() {
            record.completed_at = update.completed_at;
        }
        if update.error.is_some() {
            record.error = update.error;
        }
        self.persist(&records).await
    }

    /// All records for one groove, oldest first. Read-only, no locking.
    pub async fn query(&self, groove_name: &str) -> Result<Vec<RunRecord>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.groove_name == groove_name)
            .collect())
    }

    /// The most recent `limit` records, newest first. Read-only, no locking.
    pub async fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let records = self.load().await?;
        Ok(records.into_iter().rev().take(limit).collect())
    }

    async fn persist(&self, records: &[RunRecord]) -> Result<()> {
        let tmp = self.file.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &self.file).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Take the directory lock: atomic mkdir, with bounded retries and
    /// reclamation of locks whose mtime exceeds the staleness timeout.
    async fn acquire_lock(&self) -> Result<()> {
        if let Some(parent) = self.lock_dir.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut attempts = 0;
        while attempts < LOCK_MAX_ATTEMPTS {
            attempts += 1;
            match fs::create_dir(&self.lock_dir).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.lock_is_stale().await {
                        tracing::warn!(
                            "Reclaiming stale run-history lock at {}",
                            self.lock_dir.display()
                        );
                        let _ = fs::remove_dir_all(&self.lock_dir).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(JazzError::LockTimeout(self.lock_dir.display().to_string()))
    }

    async fn lock_is_stale(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.lock_dir).await else {
            // Holder released between our mkdir failure and this stat.
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .is_some_and(|age| age > LOCK_STALE_AFTER)
    }

    async fn release_lock(&self) {
        let _ = fs::remove_dir_all(&self.lock_dir).await;
    }
}
