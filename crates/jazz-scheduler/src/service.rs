//! Scheduler service — OS-level schedule registration behind one trait.
//!
//! Platform variants: launchd (macOS), crontab (Linux), and an unsupported
//! fallback. All of them mirror registrations as metadata files (see
//! [`crate::store`]) and answer `list`/`is_scheduled` from those files.

use std::sync::Arc;

use async_trait::async_trait;

use jazz_core::config::{JazzPaths, SchedulerConfig};
use jazz_core::error::{JazzError, Result};
use jazz_core::types::GrooveMetadata;

use crate::cron;
use crate::crontab::CrontabScheduler;
use crate::launchd::LaunchdScheduler;
use crate::store::ScheduledEntry;

/// Which native scheduler backs this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerType {
    Launchd,
    Cron,
    Unsupported,
}

impl std::fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launchd => write!(f, "launchd"),
            Self::Cron => write!(f, "cron"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// OS schedule registration for grooves.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Register a groove's cron schedule with the OS. Fails before touching
    /// the OS when the schedule is missing, invalid, or untranslatable.
    async fn schedule(&self, groove: &GrooveMetadata, agent_id: &str) -> Result<()>;

    /// Remove a groove's registration. Idempotent: unknown names succeed.
    async fn unschedule(&self, groove_name: &str) -> Result<()>;

    /// Every scheduled entry known from the metadata mirror.
    async fn list(&self) -> Result<Vec<ScheduledEntry>>;

    /// Whether a groove currently has a scheduled entry.
    async fn is_scheduled(&self, groove_name: &str) -> Result<bool>;

    fn scheduler_type(&self) -> SchedulerType;
}

/// Build the scheduler for the current platform.
pub fn platform_scheduler(paths: &JazzPaths, config: &SchedulerConfig) -> Arc<dyn Scheduler> {
    if cfg!(target_os = "macos") {
        Arc::new(LaunchdScheduler::new(paths, config))
    } else if cfg!(target_os = "linux") {
        Arc::new(CrontabScheduler::new(paths, config))
    } else {
        Arc::new(UnsupportedScheduler)
    }
}

/// Fallback for platforms without a supported native scheduler.
pub struct UnsupportedScheduler;

#[async_trait]
impl Scheduler for UnsupportedScheduler {
    async fn schedule(&self, _groove: &GrooveMetadata, _agent_id: &str) -> Result<()> {
        Err(JazzError::UnsupportedPlatform)
    }

    async fn unschedule(&self, _groove_name: &str) -> Result<()> {
        Err(JazzError::UnsupportedPlatform)
    }

    async fn list(&self) -> Result<Vec<ScheduledEntry>> {
        Ok(Vec::new())
    }

    async fn is_scheduled(&self, _groove_name: &str) -> Result<bool> {
        Ok(false)
    }

    fn scheduler_type(&self) -> SchedulerType {
        SchedulerType::Unsupported
    }
}

/// Validate and return a groove's schedule, or fail before any OS call.
pub(crate) fn require_schedule(groove: &GrooveMetadata) -> Result<&str> {
    let schedule = groove
        .schedule
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            JazzError::Scheduler(format!("Groove '{}' has no schedule", groove.name))
        })?;
    if !cron::is_valid(schedule) {
        return Err(JazzError::Scheduler(format!(
            "Groove '{}' has an invalid cron schedule: '{schedule}'",
            groove.name
        )));
    }
    Ok(schedule)
}

/// The command line that runs a groove, as an argument vector: the runner
/// program followed by `groove run <name> --agent <id> --auto-approve`.
pub(crate) fn runner_invocation(
    config: &SchedulerConfig,
    groove_name: &str,
    agent_id: &str,
) -> Result<Vec<String>> {
    let program = match &config.runner_program {
        Some(program) => program.clone(),
        None => std::env::current_exe()
            .map_err(|e| JazzError::Scheduler(format!("Cannot locate runner program: {e}")))?
            .to_string_lossy()
            .into_owned(),
    };
    Ok(vec![
        program,
        "groove".into(),
        "run".into(),
        groove_name.into(),
        "--agent".into(),
        agent_id.into(),
        "--auto-approve".into(),
    ])
}

/// Single-quote a token for inclusion in a generated shell command line.
/// Embedded single quotes become `'\''`, so groove and agent identifiers
/// cannot break out of their quoting.
pub(crate) fn shell_quote(token: &str) -> String {
    format!("'{}'", token.replace('\'', r"'\''"))
}
