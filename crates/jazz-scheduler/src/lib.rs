//! # Jazz Scheduler
//!
//! Registers grooves with the native OS scheduler and catches up runs that
//! were missed while the host process was offline.
//!
//! ## Architecture
//! ```text
//! Scheduler (per platform)
//!   ├── launchd  (macOS): plist under ~/Library/LaunchAgents, launchctl load/unload
//!   ├── crontab  (Linux): marker-delimited block rewritten via `crontab -`
//!   └── metadata: one JSON file per groove under ~/.jazz/schedules/
//!
//! Startup catch-up
//!   CatchUpOrchestrator
//!     ├── list scheduled entries → run history (last-seen per groove)
//!     ├── per groove: decide() → missed-run / already-ran / missed-window / …
//!     └── due grooves → AgentExecutor, bracketed by RunHistory records
//! ```
//!
//! The run history is a lock-protected, atomically rewritten JSON array so
//! concurrent Jazz processes never tear or lose records.

pub mod catchup;
pub mod cron;
pub mod crontab;
pub mod history;
pub mod launchd;
pub mod orchestrator;
pub mod service;
pub mod store;

pub use catchup::{decide, CatchUpDecision, CatchUpReason};
pub use crontab::CrontabScheduler;
pub use history::{RunHistory, RunRecord, RunStatus, RunUpdate, TriggeredBy};
pub use launchd::LaunchdScheduler;
pub use orchestrator::{CatchUpCandidate, CatchUpOrchestrator};
pub use service::{platform_scheduler, Scheduler, SchedulerType, UnsupportedScheduler};
pub use store::{EntryStore, ScheduledEntry};
