//! Catch-up decision engine.
//!
//! Pure: `decide` looks only at its arguments, so identical inputs always
//! produce identical decisions. Checks run cheapest-first and the first
//! decisive one wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jazz_core::types::GrooveMetadata;

use crate::cron;

/// Fallback catch-up window when a groove sets no `max_catch_up_age`.
pub const DEFAULT_CATCH_UP_WINDOW_SECS: i64 = 86_400;

/// Why a groove will or will not be caught up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatchUpReason {
    MissingSchedule,
    CatchUpDisabled,
    InvalidSchedule,
    AlreadyRan,
    MissedWindow,
    MissedRun,
}

impl std::fmt::Display for CatchUpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingSchedule => "missing-schedule",
            Self::CatchUpDisabled => "catch-up-disabled",
            Self::InvalidSchedule => "invalid-schedule",
            Self::AlreadyRan => "already-ran",
            Self::MissedWindow => "missed-window",
            Self::MissedRun => "missed-run",
        };
        write!(f, "{name}")
    }
}

/// The outcome of a catch-up evaluation for one groove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpDecision {
    pub should_run: bool,
    pub reason: CatchUpReason,
    /// The most recent cron firing at or before `now`, when one was computed.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CatchUpDecision {
    fn skip(reason: CatchUpReason) -> Self {
        Self {
            should_run: false,
            reason,
            scheduled_at: None,
        }
    }

    fn run(scheduled_at: DateTime<Utc>) -> Self {
        Self {
            should_run: true,
            reason: CatchUpReason::MissedRun,
            scheduled_at: Some(scheduled_at),
        }
    }
}

/// Decide whether a groove's missed firing should be caught up at `now`.
pub fn decide(
    groove: &GrooveMetadata,
    last_run_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CatchUpDecision {
    let Some(schedule) = groove
        .schedule
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return CatchUpDecision::skip(CatchUpReason::MissingSchedule);
    };

    // Catch-up is opt-in; absent means disabled.
    if !groove.catch_up_on_startup {
        return CatchUpDecision::skip(CatchUpReason::CatchUpDisabled);
    }

    let Some(scheduled_at) = cron::most_recent_firing(schedule, now) else {
        return CatchUpDecision::skip(CatchUpReason::InvalidSchedule);
    };

    // Inclusive boundary: a run exactly at the firing instant satisfies it.
    if let Some(last_run_at) = last_run_at {
        if last_run_at >= scheduled_at {
            return CatchUpDecision::skip(CatchUpReason::AlreadyRan);
        }
    }

    let age_secs = (now - scheduled_at).num_seconds();
    let max_age = groove
        .max_catch_up_age
        .filter(|age| *age > 0)
        .unwrap_or(DEFAULT_CATCH_UP_WINDOW_SECS);
    if age_secs > max_age {
        return CatchUpDecision::skip(CatchUpReason::MissedWindow);
    }

    CatchUpDecision::run(scheduled_at)
}
