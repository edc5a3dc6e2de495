//! Schedule metadata store — one JSON file per groove.
//!
//! These files mirror the OS-level registrations and are the source of truth
//! for `list`/`is_scheduled`. Human-readable, git-friendly.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use jazz_core::error::Result;

/// The persisted record of one groove's schedule assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEntry {
    pub groove_name: String,
    pub schedule: String,
    pub agent: String,
    pub enabled: bool,
}

/// File-based store for `ScheduledEntry` records.
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn entry_path(&self, groove_name: &str) -> PathBuf {
        self.dir.join(format!("{groove_name}.json"))
    }

    /// Persist an entry, creating the schedules directory on first use.
    pub async fn save(&self, entry: &ScheduledEntry) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(self.entry_path(&entry.groove_name), json).await?;
        Ok(())
    }

    /// Remove an entry. Already-absent files are fine.
    pub async fn remove(&self, groove_name: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(groove_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read one entry. Missing or malformed files read as None.
    pub async fn get(&self, groove_name: &str) -> Option<ScheduledEntry> {
        let bytes = fs::read(self.entry_path(groove_name)).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Read every entry in the schedules directory, skipping files that are
    /// not valid entries.
    pub async fn load_all(&self) -> Result<Vec<ScheduledEntry>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        while let Some(file) = dir.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path).await else {
                continue;
            };
            match serde_json::from_slice::<ScheduledEntry>(&bytes) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::debug!("Skipping malformed schedule file {}: {e}", path.display());
                }
            }
        }
        entries.sort_by(|a, b| a.groove_name.cmp(&b.groove_name));
        Ok(entries)
    }
}
